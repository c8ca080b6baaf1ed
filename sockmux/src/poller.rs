//! Poller: fixed-capacity readiness multiplexer.
//!
//! Registrations are appended in order and never removed, so the i-th
//! successful registration keeps index i for the poller's whole life.
//! Results are written back positionally on every poll.

use crate::context::ContextInner;
use crate::socket::Socket;
use sockmux_core::error::Result;
use sockmux_core::flags::PollEvents;
use sockmux_core::transport::{PollItem, SocketHandle};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Convert a millisecond timeout; negative means no deadline.
fn to_duration(timeout_ms: i64) -> Option<Duration> {
    u64::try_from(timeout_ms).ok().map(Duration::from_millis)
}

/// A bounded set of sockets polled together.
///
/// The poller does not own the registered sockets; closing one makes its
/// entry report [`PollEvents::ERROR`].
///
/// ## Example
///
/// ```rust
/// use sockmux::{Context, SendFlags, SocketType};
///
/// # fn main() -> sockmux::Result<()> {
/// let ctx = Context::new(1)?;
/// let push = ctx.socket(SocketType::Push)?;
/// let pull = ctx.socket(SocketType::Pull)?;
/// pull.bind("inproc://jobs")?;
/// push.connect("inproc://jobs")?;
///
/// let mut poller = ctx.poller(2)?;
/// let p = poller.register(&push).unwrap();
/// let q = poller.register(&pull).unwrap();
/// assert_eq!(poller.poll()?, 1);
/// assert!(poller.is_writable(p));
///
/// push.send(&b"job"[..], SendFlags::NONE)?;
/// assert_eq!(poller.poll()?, 2);
/// assert!(poller.is_readable(q));
/// # Ok(())
/// # }
/// ```
pub struct Poller {
    ctx: Arc<ContextInner>,
    capacity: usize,
    items: Vec<PollItem>,
    timeout: i64,
}

impl Poller {
    pub(crate) fn new(ctx: Arc<ContextInner>, capacity: usize) -> Self {
        Self {
            ctx,
            capacity,
            items: Vec::with_capacity(capacity),
            timeout: 0,
        }
    }

    /// Register `socket` for every condition.
    pub fn register(&mut self, socket: &Socket) -> Option<usize> {
        self.register_with(socket, PollEvents::ALL)
    }

    /// Register `socket` for the conditions in `events`.
    ///
    /// Returns the assigned index, or `None` when the poller is full or the
    /// socket belongs to another context. A refused registration changes
    /// nothing.
    pub fn register_with(&mut self, socket: &Socket, events: PollEvents) -> Option<usize> {
        if self.items.len() >= self.capacity || !socket.belongs_to(&self.ctx) {
            return None;
        }
        let index = self.items.len();
        self.items.push(PollItem::new(socket.handle(), events));
        trace!(socket = %socket.handle(), index, ?events, "registered");
        Some(index)
    }

    /// Poll with the stored timeout.
    pub fn poll(&mut self) -> Result<usize> {
        self.poll_timeout(self.timeout)
    }

    /// Poll with an explicit timeout in milliseconds.
    ///
    /// `0` reports current readiness without waiting; a negative value
    /// waits until something is ready. Returns the number of entries with
    /// a non-empty result.
    ///
    /// # Errors
    ///
    /// [`SockmuxError::Lifecycle`](sockmux_core::error::SockmuxError::Lifecycle)
    /// when the context has been terminated, including while waiting.
    pub fn poll_timeout(&mut self, timeout_ms: i64) -> Result<usize> {
        if self.items.is_empty() || self.capacity == 0 {
            return Ok(0);
        }
        for item in &mut self.items {
            item.revents = PollEvents::NONE;
        }
        let ready = self
            .ctx
            .transport()?
            .wait(&mut self.items, to_duration(timeout_ms))?;
        trace!(ready, timeout_ms, "poll returned");
        Ok(ready)
    }

    fn revents(&self, index: usize) -> PollEvents {
        self.items.get(index).map_or(PollEvents::NONE, |item| item.revents)
    }

    /// Entry `index` was readable at the last poll.
    pub fn is_readable(&self, index: usize) -> bool {
        self.revents(index).is_readable()
    }

    /// Entry `index` was writable at the last poll.
    pub fn is_writable(&self, index: usize) -> bool {
        self.revents(index).is_writable()
    }

    /// Entry `index` reported an error at the last poll.
    pub fn is_errored(&self, index: usize) -> bool {
        self.revents(index).is_error()
    }

    /// Socket handle registered at `index`.
    pub fn handle(&self, index: usize) -> Option<SocketHandle> {
        self.items.get(index).map(|item| item.handle)
    }

    /// Interest mask registered at `index`.
    pub fn events(&self, index: usize) -> Option<PollEvents> {
        self.items.get(index).map(|item| item.events)
    }

    /// Default timeout in milliseconds used by [`poll`](Self::poll).
    pub fn timeout(&self) -> i64 {
        self.timeout
    }

    /// Change the default timeout.
    pub fn set_timeout(&mut self, timeout_ms: i64) {
        self.timeout = timeout_ms;
    }

    /// Maximum number of registrations.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registered sockets.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Nothing registered yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// No room for another registration.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("capacity", &self.capacity)
            .field("items", &self.items)
            .field("timeout", &self.timeout)
            .finish()
    }
}
