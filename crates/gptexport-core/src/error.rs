//! Error types shared by every execution context.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No active tab found")]
    NoActiveTab,

    #[error("Could not reach {0}")]
    AgentUnreachable(String),

    #[error("No reply from {endpoint} within {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("{0}")]
    Validation(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
