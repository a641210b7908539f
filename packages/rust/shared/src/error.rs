//! Error types for flowgraph.
//!
//! Library crates use [`FlowGraphError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Classification and both text grammars never fail: unmatched lines are
//! skipped. Only foreign payloads, configuration and file I/O surface errors.

use std::path::PathBuf;

/// Top-level error type for all flowgraph operations.
#[derive(Debug, thiserror::Error)]
pub enum FlowGraphError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Text could not be turned into a graph.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A foreign graph payload was malformed or missing required fields.
    #[error("payload error: {message}")]
    Payload { message: String },

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad option values, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A batch worker task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FlowGraphError>;

impl FlowGraphError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a payload error from any displayable message.
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::Payload {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
