//! Gemini Live provider.

pub mod client;
pub mod config;
pub mod messages;

pub use client::{GeminiHandle, GeminiLive};
pub use config::{INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE};
