//! Error types for Draftwright.
//!
//! Library crates use [`DraftwrightError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Draftwright operations.
#[derive(Debug, thiserror::Error)]
pub enum DraftwrightError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Database or snapshot persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Generation collaborator error (bridge process, protocol, or response).
    #[error("generation error: {0}")]
    Generation(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (payload/stage mismatch, wrong selection shape, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Parsing error for user-supplied or generated content.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Export writing error.
    #[error("export error: {0}")]
    Export(String),

    /// Upstream selections required by an operation are not in place.
    #[error("not ready: select {} first", missing.join(", "))]
    NotReady { missing: Vec<String> },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DraftwrightError>;

impl DraftwrightError {
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

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a blocking "not ready" error listing missing prerequisites.
    pub fn not_ready<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::NotReady {
            missing: missing.into_iter().map(Into::into).collect(),
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
