//! Server error types.

use std::io;
use std::net::SocketAddr;

use rested_protocol::{BinderState, ErrorCode, ProtocolError, Uri};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (socket, file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error (framing, encoding, etc.).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The listen address is taken.
    #[error("address already in use: {addr}")]
    AddressInUse { addr: SocketAddr },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("server is not running (state: {state})")]
    NotRunning { state: BinderState },

    /// The connection that should carry a reply is gone.
    #[error("reply could not be delivered")]
    ReplyDropped,

    /// Notification on a canceled event.
    #[error("subscription to {uri} is canceled")]
    SubscriptionCanceled { uri: Uri },

    /// A stop request overtook the operation.
    #[error("server shutdown requested")]
    Shutdown,
}

impl ServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classifies this error for error observers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) | Self::ReplyDropped => ErrorCode::Io,
            Self::Protocol(e) => e.code(),
            Self::AddressInUse { .. } => ErrorCode::AddressInUse,
            Self::Config { .. } => ErrorCode::Protocol,
            Self::NotRunning { .. } => ErrorCode::NotRunning,
            Self::SubscriptionCanceled { .. } | Self::Shutdown => ErrorCode::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        let addr: SocketAddr = ([127, 0, 0, 1], 8080).into();
        let err = ServerError::AddressInUse { addr };
        assert_eq!(err.code(), ErrorCode::AddressInUse);
        assert_eq!(err.to_string(), "address already in use: 127.0.0.1:8080");

        let err = ServerError::from(ProtocolError::EmptyMessage);
        assert_eq!(err.code(), ErrorCode::Protocol);
        assert_eq!(ServerError::ReplyDropped.code(), ErrorCode::Io);
    }
}
