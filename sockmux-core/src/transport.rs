//! Transport abstraction.
//!
//! The messaging engine behind a context: it owns connection state,
//! queues and readiness. Contexts, sockets and pollers only ever talk to
//! it through [`Transport`], addressing sockets by [`SocketHandle`].
//! Opening a context is constructing a transport; terminating it is
//! [`Transport::shutdown`].

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::flags::{PollEvents, RecvFlags, SendFlags};
use crate::monitor::SocketMonitor;
use crate::options::{OptionName, OptionValue, SocketOption, SocketOptions};
use crate::socket_type::SocketType;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;

/// Opaque identifier of a socket inside one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketHandle(u64);

impl SocketHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// One entry of a multiplexed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollItem {
    pub handle: SocketHandle,
    /// Conditions the caller is interested in
    pub events: PollEvents,
    /// Conditions observed by the last wait
    pub revents: PollEvents,
}

impl PollItem {
    pub const fn new(handle: SocketHandle, events: PollEvents) -> Self {
        Self {
            handle,
            events,
            revents: PollEvents::NONE,
        }
    }
}

/// Messaging engine primitives.
///
/// All calls are synchronous. `send`, `recv` and `wait` may block the
/// calling thread; everything else only touches local state. A transport
/// that has been shut down fails every call except `close_socket` with a
/// lifecycle error.
pub trait Transport: Send + Sync {
    /// Number of I/O threads this transport was opened with.
    fn io_threads(&self) -> usize;

    /// Create a socket with an initial option table.
    fn open_socket(&self, socket_type: SocketType, options: SocketOptions)
        -> Result<SocketHandle>;

    /// Release a socket. Unknown or already released handles are a no-op.
    fn close_socket(&self, handle: SocketHandle) -> Result<()>;

    fn set_option(&self, handle: SocketHandle, option: SocketOption) -> Result<()>;

    fn get_option(&self, handle: SocketHandle, name: OptionName) -> Result<OptionValue>;

    /// Start accepting peers at `endpoint`.
    fn bind(&self, handle: SocketHandle, endpoint: &Endpoint) -> Result<()>;

    /// Start attaching to `endpoint`; completion is asynchronous.
    fn connect(&self, handle: SocketHandle, endpoint: &Endpoint) -> Result<()>;

    /// Hand one frame to the engine.
    ///
    /// Returns `Ok(false)` when `NOBLOCK` is set and the frame cannot be
    /// queued right now; nothing is enqueued in that case.
    fn send(&self, handle: SocketHandle, frame: Bytes, flags: SendFlags) -> Result<bool>;

    /// Hand a whole message to the engine atomically.
    ///
    /// Under `NOBLOCK` either every frame is queued or none is.
    fn send_multipart(
        &self,
        handle: SocketHandle,
        frames: Vec<Bytes>,
        flags: SendFlags,
    ) -> Result<bool>;

    /// Take the next frame. `Ok(None)` only under `NOBLOCK`.
    fn recv(&self, handle: SocketHandle, flags: RecvFlags) -> Result<Option<Bytes>>;

    /// Wait until at least one item is ready or `timeout` elapses.
    ///
    /// `None` waits indefinitely; `Some(Duration::ZERO)` reports current
    /// readiness. Results are written to each item's `revents`; the
    /// return value counts items with a non-empty result.
    fn wait(&self, items: &mut [PollItem], timeout: Option<Duration>) -> Result<usize>;

    /// Subscribe to lifecycle events of a socket.
    fn monitor(&self, handle: SocketHandle) -> Result<SocketMonitor>;

    /// Release every resource and wake all blocked callers. Idempotent.
    fn shutdown(&self);
}
