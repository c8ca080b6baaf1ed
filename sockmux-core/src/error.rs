/// Sockmux Error Types
///
/// Every failure surfaced by contexts, sockets and pollers.

use crate::endpoint::{Endpoint, EndpointError};
use crate::socket_type::SocketType;
use std::io;
use thiserror::Error;

/// Main error type for sockmux operations
#[derive(Error, Debug)]
pub enum SockmuxError {
    /// Native resource could not be allocated (context, socket, poller)
    #[error("Resource error: {0}")]
    Resource(String),

    /// Malformed endpoint string on bind/connect
    #[error("Address error: {0}")]
    Address(#[from] EndpointError),

    /// Endpoint already in use or unavailable
    #[error("Bind error on {endpoint}: {reason}")]
    Bind { endpoint: Endpoint, reason: String },

    /// Operation on a released socket or a terminated context
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Option value rejected at the API boundary
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Message rejected before reaching the transport
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Operation not offered by the socket pattern
    #[error("{operation} is not supported by {socket_type} sockets")]
    Unsupported {
        socket_type: SocketType,
        operation: &'static str,
    },

    /// Request/reply alternation violated
    #[error("Operation not valid in current socket state: {0}")]
    State(String),
}

/// Result type alias for sockmux operations
pub type Result<T> = std::result::Result<T, SockmuxError>;

impl SockmuxError {
    /// Create a resource error with a message
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Create a lifecycle error with a message
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Create an invalid option error with a message
    pub fn invalid_option(msg: impl Into<String>) -> Self {
        Self::InvalidOption(msg.into())
    }

    /// Create a state error with a message
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a bind error for `endpoint`
    pub fn bind(endpoint: Endpoint, reason: impl Into<String>) -> Self {
        Self::Bind {
            endpoint,
            reason: reason.into(),
        }
    }

    /// Check if the error comes from a released handle or terminated context
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Lifecycle(_))
    }

    /// Check if retrying the same call later can succeed
    ///
    /// Bind conflicts clear once the holder closes, and a request/reply
    /// state error clears once the missing half of the exchange happens.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Bind { .. } | Self::State(_))
    }
}

impl From<SockmuxError> for io::Error {
    fn from(err: SockmuxError) -> Self {
        let kind = match &err {
            SockmuxError::Resource(_) => io::ErrorKind::OutOfMemory,
            SockmuxError::Address(_) => io::ErrorKind::InvalidInput,
            SockmuxError::Bind { .. } => io::ErrorKind::AddrInUse,
            SockmuxError::Lifecycle(_) => io::ErrorKind::NotConnected,
            SockmuxError::InvalidOption(_) | SockmuxError::InvalidMessage(_) => {
                io::ErrorKind::InvalidInput
            }
            SockmuxError::Unsupported { .. } => io::ErrorKind::Unsupported,
            SockmuxError::State(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
