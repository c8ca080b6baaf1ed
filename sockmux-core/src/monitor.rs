//! Socket event monitoring.
//!
//! Provides event streams for tracking socket lifecycle events like
//! bindings, peer attachments and disconnections.

use crate::endpoint::Endpoint;
use std::fmt;

/// Socket lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Socket successfully bound to an endpoint.
    Bound(Endpoint),

    /// Bind operation failed.
    BindFailed { endpoint: Endpoint, reason: String },

    /// Socket attached to the peer bound at an endpoint.
    Connected(Endpoint),

    /// Connect parked until something binds the endpoint.
    ConnectDelayed(Endpoint),

    /// Peer refused the attachment.
    ConnectFailed { endpoint: Endpoint, reason: String },

    /// A connecting peer attached to one of our bound endpoints.
    Accepted(Endpoint),

    /// A peer on this endpoint went away.
    Disconnected(Endpoint),

    /// Socket closed.
    Closed,
}

impl fmt::Display for SocketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bound(ep) => write!(f, "Bound to {ep}"),
            Self::BindFailed { endpoint, reason } => {
                write!(f, "Bind failed for {endpoint}: {reason}")
            }
            Self::Connected(ep) => write!(f, "Connected to {ep}"),
            Self::ConnectDelayed(ep) => write!(f, "Connect to {ep} delayed"),
            Self::ConnectFailed { endpoint, reason } => {
                write!(f, "Connect failed for {endpoint}: {reason}")
            }
            Self::Accepted(ep) => write!(f, "Accepted connection on {ep}"),
            Self::Disconnected(ep) => write!(f, "Disconnected from {ep}"),
            Self::Closed => f.write_str("Closed"),
        }
    }
}

/// Handle for receiving socket events.
pub type SocketMonitor = flume::Receiver<SocketEvent>;

/// Sender side of a monitor, held by the transport.
pub type SocketEventSender = flume::Sender<SocketEvent>;

/// Creates a new monitoring channel pair.
#[must_use]
pub fn create_monitor() -> (SocketEventSender, SocketMonitor) {
    flume::unbounded()
}
