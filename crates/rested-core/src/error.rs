//! Codec error types.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The text is not a well-formed document.
    #[error("malformed document at byte {offset}: {reason}")]
    MalformedDocument { reason: String, offset: usize },
}

impl CodecError {
    /// Creates a malformed document error.
    pub fn malformed(reason: impl Into<String>, offset: usize) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
            offset,
        }
    }

    /// Returns the byte offset the error was detected at.
    pub fn offset(&self) -> usize {
        match self {
            Self::MalformedDocument { offset, .. } => *offset,
        }
    }
}
