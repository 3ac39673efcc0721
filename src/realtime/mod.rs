//! Realtime model client types.
//!
//! Shared types for the speech-to-speech provider layer: errors, session
//! configuration, tool declarations, and callback aliases. The Gemini Live
//! client in [`gemini`] is the single provider.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

pub mod gemini;

/// Errors from realtime provider operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<serde_json::Error> for RealtimeError {
    fn from(e: serde_json::Error) -> Self {
        RealtimeError::SerializationError(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        RealtimeError::WebSocketError(e.to_string())
    }
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Output modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Audio,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Audio => "AUDIO",
        }
    }
}

/// A function tool declaration advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the function arguments
    pub parameters: Value,
}

/// A function call requested by the model.
#[derive(Debug, Clone)]
pub struct FunctionCallRequest {
    /// Provider-assigned call id, echoed back in the response
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// PCM16 audio produced by the model.
#[derive(Debug, Clone)]
pub struct RealtimeAudioData {
    /// Little-endian PCM16 samples
    pub data: Bytes,
    pub sample_rate: u32,
}

/// Session configuration handed to a provider client.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub temperature: f32,
    pub modalities: Vec<Modality>,
    /// System instructions (persona) for the session
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
}

/// Callback for audio chunks produced by the model.
pub type AudioOutputCallback =
    Arc<dyn Fn(RealtimeAudioData) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback for function calls requested by the model.
pub type FunctionCallCallback =
    Arc<dyn Fn(FunctionCallRequest) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback for provider-side errors surfaced asynchronously.
pub type RealtimeErrorCallback =
    Arc<dyn Fn(RealtimeError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modality_wire_names() {
        assert_eq!(Modality::Audio.as_str(), "AUDIO");
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: RealtimeError = serde_json::from_str::<Value>("not json").unwrap_err().into();
        assert!(matches!(err, RealtimeError::SerializationError(_)));
    }
}
