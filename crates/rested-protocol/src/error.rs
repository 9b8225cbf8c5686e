//! Protocol error types.

use rested_core::CodecError;
use thiserror::Error;

use crate::lifecycle::BinderState;
use crate::observer::ErrorCode;
use crate::policy::SubscriptionState;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds the allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: u32, max: u32 },

    /// Failed to serialize or parse an envelope.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The peer speaks another protocol version.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty message")]
    EmptyMessage,

    #[error("timeout during {operation}")]
    Timeout { operation: String },

    /// A payload could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid URI {input:?}: {reason}")]
    InvalidUri { input: String, reason: String },

    #[error("unknown status code: {0}")]
    UnknownStatus(u16),

    #[error("unknown request method: {0}")]
    UnknownMethod(String),

    /// Attempt to leave the terminal `Canceled` state.
    #[error("subscription cannot move from {from} to {to}")]
    SubscriptionStateViolation {
        from: SubscriptionState,
        to: SubscriptionState,
    },

    /// A lifecycle transition was requested from a state that does not allow it.
    #[error("cannot {action} a binder that is {state}")]
    InvalidTransition {
        state: BinderState,
        action: &'static str,
    },
}

impl ProtocolError {
    pub(crate) fn invalid_uri(input: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUri {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Classifies this error for error observers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::Io,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Codec(_) => ErrorCode::MalformedDocument,
            Self::InvalidTransition { .. } => ErrorCode::NotRunning,
            Self::SubscriptionStateViolation { .. } => ErrorCode::Rejected,
            Self::MessageTooLarge { .. }
            | Self::Serialization(_)
            | Self::UnsupportedVersion(_)
            | Self::EmptyMessage
            | Self::InvalidUri { .. }
            | Self::UnknownStatus(_)
            | Self::UnknownMethod(_) => ErrorCode::Protocol,
        }
    }
}
