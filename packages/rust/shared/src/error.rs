//! Error types for qnasync.
//!
//! Library crates use [`QnaSyncError`] via `thiserror`.
//! App crates (cli/server) wrap this with `color-eyre` for rich diagnostics.

/// Top-level error type for all qnasync operations.
#[derive(Debug, thiserror::Error)]
pub enum QnaSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to Confluence, blob storage, or the QnA API.
    #[error("network error: {0}")]
    Network(String),

    /// Response body parsing or field extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Blob storage upload or SAS generation error.
    #[error("storage error: {0}")]
    Storage(String),

    /// QnA knowledge-base API error.
    #[error("qna error: {0}")]
    Qna(String),

    /// Data validation error (missing field, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QnaSyncError>;

impl QnaSyncError {
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
}
