//! Error types for TallyKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TallyError
pub type Result<T> = std::result::Result<T, TallyError>;

/// Unified error type for TallyKV operations
#[derive(Debug, Error)]
pub enum TallyError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Key not found")]
    KeyNotFound,

    /// Reclamation found nothing worth rewriting
    #[error("value log GC attempt didn't result in any cleanup")]
    NoRewrite,

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("database is unavailable")]
    Unavailable,

    #[error("invalid lifecycle transition: {0}")]
    InvalidLifecycle(String),

    // -------------------------------------------------------------------------
    // Command Errors
    // -------------------------------------------------------------------------
    #[error("value is not an integer or out of range")]
    NonInteger,

    #[error("value is not a valid float")]
    NonFloat,

    #[error("violate constraints")]
    ConstraintViolated,

    #[error("increment or decrement would overflow")]
    Overflow,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    /// Request rejected before touching the store. Messages carry their
    /// own `ERR` prefix so they can go out on the wire unchanged.
    #[error("{0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TallyError {
    /// Build a protocol error, adding the `ERR` prefix when missing
    pub fn protocol(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.starts_with("ERR ") {
            TallyError::Protocol(message)
        } else {
            TallyError::Protocol(format!("ERR {}", message))
        }
    }

    /// `ERR wrong number of arguments for '<command>' command`
    pub fn wrong_arity(command: &str) -> Self {
        TallyError::Protocol(format!(
            "ERR wrong number of arguments for '{}' command",
            command
        ))
    }

    /// Message as it should appear in a RESP error reply
    pub fn to_reply_message(&self) -> String {
        match self {
            TallyError::Protocol(message) => message.clone(),
            other => format!("ERR {}", other),
        }
    }
}
