//! Error types for sqlshim.

use thiserror::Error;

use crate::store::StoreError;

/// The main error type for translating and executing a statement.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// The statement text could not be parsed.
    #[error("Parse error at position {position}: {reason}")]
    Parse { position: usize, reason: String },

    /// A `$n` placeholder points past the end of the supplied parameters.
    #[error("Parameter ${index} is out of range ({supplied} supplied)")]
    ParamOutOfRange { index: u32, supplied: usize },

    /// The underlying store call failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Unrecognized statement text, only raised in strict mode.
    #[error("Unsupported statement: '{0}'")]
    UnsupportedStatement(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranslationError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            position,
            reason: reason.into(),
        }
    }

    /// True for every error raised before the store is contacted because the
    /// statement or its parameters are malformed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::ParamOutOfRange { .. })
    }
}

/// Result type alias for sqlshim operations.
pub type TranslationResult<T> = Result<T, TranslationError>;
