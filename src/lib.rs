pub mod agent;
pub mod bootstrap;
pub mod check;
pub mod config;
pub mod errors;
pub mod realtime;
pub mod session;
pub mod tools;
pub mod worker;

// Re-export commonly used items for convenience
pub use agent::Agent;
pub use config::AgentConfig;
pub use errors::{AgentError, AgentResult};
pub use session::{AgentSession, RoomIoOptions, SessionOptions};
pub use tools::ToolRegistry;
pub use worker::{JobContext, JobRequest, Worker, WorkerOptions};
