//! Client error types.

use std::io;

use rested_protocol::{BinderState, ErrorCode, ProtocolError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Framing, envelope or payload error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("connection to {address} failed: {reason}")]
    Connection { address: String, reason: String },

    #[error("timeout while {0}")]
    Timeout(String),

    /// The binder is not in the running state.
    #[error("client is not running (state: {state})")]
    NotRunning { state: BinderState },

    /// A forced stop aborted the operation.
    #[error("request aborted by client shutdown")]
    Shutdown,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn connection(address: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    /// Classifies this error for error observers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::Io,
            Self::Protocol(e) => e.code(),
            Self::Connection { .. } => ErrorCode::ConnectionFailed,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::NotRunning { .. } => ErrorCode::NotRunning,
            Self::Shutdown | Self::InvalidRequest(_) => ErrorCode::Rejected,
            Self::Config { .. } => ErrorCode::Protocol,
        }
    }
}
