//! Error types for studyhall-core.
//!
//! Only two failure classes are ever surfaced to a requester: a rejected
//! transition (a normal reply, not an error -- see [`crate::session::TransitionError`])
//! and a durability failure, meaning the append to the external log did not
//! land and in-memory state was left untouched. Everything else is recovered
//! locally.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studyhall-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The durable log channel failed. On a trigger path this means the
    /// append did not land and the mutation was aborted.
    #[error("durable log channel failure: {0}")]
    Durability(#[from] LogError),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures talking to the durable log channel.
#[derive(Error, Debug)]
pub enum LogError {
    /// No log channel is bound for the community, or it cannot be reached.
    #[error("log channel is not configured or unreachable")]
    Unavailable,

    /// The channel refused the append (permissions, rate limit).
    #[error("log channel rejected the append: {0}")]
    Rejected(String),

    /// Transport-level failure.
    #[error("log channel I/O failed: {0}")]
    Io(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Best-effort presentation failure (panel edit, announcement). Callers log
/// these and drop them; they never propagate into the mutation path.
#[derive(Error, Debug)]
#[error("presentation failed: {0}")]
pub struct PresentError(pub String);

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
