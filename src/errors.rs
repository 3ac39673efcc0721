//! Error types shared across the agent.

use thiserror::Error;

use crate::realtime::RealtimeError;
use crate::tools::ToolError;

/// Errors surfaced by the agent worker and session plumbing.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Room or worker connection failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Token minting or credential failure
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Session-level failure (start, reply generation)
    #[error("Session error: {0}")]
    Session(String),

    /// Worker protocol failure
    #[error("Worker error: {0}")]
    Worker(String),

    /// Realtime model client failure
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// Tool dispatch failure
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

impl From<livekit::RoomError> for AgentError {
    fn from(e: livekit::RoomError) -> Self {
        AgentError::Connection(e.to_string())
    }
}

impl From<livekit_api::access_token::AccessTokenError> for AgentError {
    fn from(e: livekit_api::access_token::AccessTokenError) -> Self {
        AgentError::Auth(e.to_string())
    }
}
