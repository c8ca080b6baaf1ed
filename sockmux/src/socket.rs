//! Socket: one endpoint of a messaging pattern.

use crate::context::ContextInner;
use bytes::Bytes;
use sockmux_core::endpoint::Endpoint;
use sockmux_core::error::{Result, SockmuxError};
use sockmux_core::flags::{RecvFlags, SendFlags};
use sockmux_core::message::Message;
use sockmux_core::monitor::SocketMonitor;
use sockmux_core::options::{OptionName, OptionValue, SocketOption};
use sockmux_core::socket_type::SocketType;
use sockmux_core::transport::{SocketHandle, Transport};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// A socket created by a [`Context`](crate::Context).
///
/// The socket keeps its context's engine alive. Every call checks that
/// neither the socket nor its context has been released and fails with
/// [`SockmuxError::Lifecycle`] otherwise.
///
/// One thread may send while another receives; concurrent sends (or
/// concurrent receives) on the same socket must be serialized by the
/// caller.
///
/// ## Example
///
/// ```rust
/// use sockmux::{Context, RecvFlags, SendFlags, SocketType};
///
/// # fn main() -> sockmux::Result<()> {
/// let ctx = Context::new(1)?;
/// let a = ctx.socket(SocketType::Pair)?;
/// let b = ctx.socket(SocketType::Pair)?;
/// a.bind("inproc://pair")?;
/// b.connect("inproc://pair")?;
///
/// b.send(&b"header"[..], SendFlags::SNDMORE)?;
/// b.send(&b"body"[..], SendFlags::NONE)?;
///
/// assert_eq!(a.recv(RecvFlags::NONE)?.unwrap(), "header");
/// assert!(a.has_receive_more()?);
/// assert_eq!(a.recv(RecvFlags::NONE)?.unwrap(), "body");
/// assert!(!a.has_receive_more()?);
/// # Ok(())
/// # }
/// ```
pub struct Socket {
    ctx: Arc<ContextInner>,
    handle: SocketHandle,
    socket_type: SocketType,
    closed: AtomicBool,
}

impl Socket {
    pub(crate) fn new(ctx: Arc<ContextInner>, handle: SocketHandle, socket_type: SocketType) -> Self {
        Self {
            ctx,
            handle,
            socket_type,
            closed: AtomicBool::new(false),
        }
    }

    fn transport(&self) -> Result<&dyn Transport> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SockmuxError::lifecycle(format!(
                "{} socket {} is closed",
                self.socket_type, self.handle
            )));
        }
        self.ctx.transport()
    }

    pub(crate) fn belongs_to(&self, ctx: &Arc<ContextInner>) -> bool {
        Arc::ptr_eq(&self.ctx, ctx)
    }

    /// Pattern of this socket.
    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    /// Engine handle of this socket.
    pub fn handle(&self) -> SocketHandle {
        self.handle
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Accept peers at `endpoint`.
    ///
    /// # Errors
    ///
    /// [`SockmuxError::Lifecycle`] once the socket or its context is gone,
    /// [`SockmuxError::Address`] for a malformed endpoint,
    /// [`SockmuxError::Bind`] when the endpoint is already bound.
    pub fn bind(&self, endpoint: &str) -> Result<()> {
        let transport = self.transport()?;
        let endpoint = Endpoint::parse(endpoint)?;
        transport.bind(self.handle, &endpoint)
    }

    /// Attach to the socket bound at `endpoint`.
    ///
    /// Returns immediately; if nothing is bound there yet, the attachment
    /// completes when something is.
    ///
    /// # Errors
    ///
    /// [`SockmuxError::Lifecycle`] once the socket or its context is gone,
    /// [`SockmuxError::Address`] for a malformed endpoint.
    pub fn connect(&self, endpoint: &str) -> Result<()> {
        let transport = self.transport()?;
        let endpoint = Endpoint::parse(endpoint)?;
        transport.connect(self.handle, &endpoint)
    }

    /// Send one frame.
    ///
    /// With [`SendFlags::SNDMORE`] the frame is a non-final part of a
    /// multi-part message. With [`SendFlags::NOBLOCK`] returns `Ok(false)`
    /// instead of blocking when the message cannot be queued now; nothing
    /// is queued in that case.
    pub fn send(&self, frame: impl Into<Bytes>, flags: SendFlags) -> Result<bool> {
        let frame = frame.into();
        trace!(socket = %self.handle, len = frame.len(), ?flags, "send");
        self.transport()?.send(self.handle, frame, flags)
    }

    /// Send a whole multi-part message at once.
    ///
    /// Under [`SendFlags::NOBLOCK`] either every part is queued or none is.
    pub fn send_multipart(&self, msg: impl Into<Message>, flags: SendFlags) -> Result<bool> {
        let frames = msg.into().into_frames();
        self.transport()?.send_multipart(self.handle, frames, flags)
    }

    /// Receive one frame.
    ///
    /// `Ok(None)` only with [`RecvFlags::NOBLOCK`] when nothing is pending.
    /// Check [`has_receive_more`](Self::has_receive_more) to find the end
    /// of a multi-part message.
    pub fn recv(&self, flags: RecvFlags) -> Result<Option<Bytes>> {
        self.transport()?.recv(self.handle, flags)
    }

    /// Receive every part of the next message.
    pub fn recv_multipart(&self, flags: RecvFlags) -> Result<Option<Message>> {
        let Some(first) = self.recv(flags)? else {
            return Ok(None);
        };
        let mut msg = Message::new().push(first);
        while self.has_receive_more()? {
            // Remaining parts arrived with the first one.
            match self.recv(RecvFlags::NONE)? {
                Some(frame) => msg = msg.push(frame),
                None => break,
            }
        }
        Ok(Some(msg))
    }

    /// Set one option.
    ///
    /// # Errors
    ///
    /// [`SockmuxError::InvalidOption`] when the value is rejected; the
    /// option table is unchanged in that case.
    pub fn set_option(&self, option: SocketOption) -> Result<()> {
        self.transport()?.set_option(self.handle, option)
    }

    /// Read one option.
    pub fn get_option(&self, name: OptionName) -> Result<OptionValue> {
        self.transport()?.get_option(self.handle, name)
    }

    fn get_u64(&self, name: OptionName) -> Result<u64> {
        let value = self.get_option(name)?;
        value
            .as_u64()
            .ok_or_else(|| SockmuxError::invalid_option(format!("{name} is not numeric: {value:?}")))
    }

    /// High water mark in messages, 0 for unlimited.
    pub fn hwm(&self) -> Result<u64> {
        self.get_u64(OptionName::Hwm)
    }

    /// Set the high water mark.
    pub fn set_hwm(&self, hwm: u64) -> Result<()> {
        self.set_option(SocketOption::Hwm(hwm))
    }

    /// Overflow budget in bytes once the high water mark is reached.
    pub fn swap(&self) -> Result<u64> {
        self.get_u64(OptionName::Swap)
    }

    /// Set the overflow budget.
    pub fn set_swap(&self, swap: u64) -> Result<()> {
        self.set_option(SocketOption::Swap(swap))
    }

    /// I/O thread affinity bitmask.
    pub fn affinity(&self) -> Result<u64> {
        self.get_u64(OptionName::Affinity)
    }

    /// Set the I/O thread affinity.
    pub fn set_affinity(&self, affinity: u64) -> Result<()> {
        self.set_option(SocketOption::Affinity(affinity))
    }

    /// Identity presented to peers; empty when none is configured.
    pub fn identity(&self) -> Result<Bytes> {
        match self.get_option(OptionName::Identity)? {
            OptionValue::Bytes(id) => Ok(id),
            other => Err(SockmuxError::invalid_option(format!(
                "identity is not a byte string: {other:?}"
            ))),
        }
    }

    /// Set the identity; at most 255 bytes, not starting with a zero byte.
    pub fn set_identity(&self, identity: impl Into<Bytes>) -> Result<()> {
        self.set_option(SocketOption::Identity(identity.into()))
    }

    /// Add a prefix filter. An empty prefix accepts every message.
    pub fn subscribe(&self, prefix: impl Into<Bytes>) -> Result<()> {
        self.set_option(SocketOption::Subscribe(prefix.into()))
    }

    /// Remove one instance of a prefix filter.
    pub fn unsubscribe(&self, prefix: impl Into<Bytes>) -> Result<()> {
        self.set_option(SocketOption::Unsubscribe(prefix.into()))
    }

    /// Multicast rate in kilobits per second.
    pub fn rate(&self) -> Result<u64> {
        self.get_u64(OptionName::Rate)
    }

    /// Set the multicast rate.
    pub fn set_rate(&self, rate: u64) -> Result<()> {
        self.set_option(SocketOption::Rate(rate))
    }

    /// Multicast recovery interval.
    pub fn recovery_interval(&self) -> Result<Duration> {
        let value = self.get_option(OptionName::RecoveryInterval)?;
        value.as_duration().ok_or_else(|| {
            SockmuxError::invalid_option(format!("recovery interval is not a duration: {value:?}"))
        })
    }

    /// Set the multicast recovery interval.
    pub fn set_recovery_interval(&self, interval: Duration) -> Result<()> {
        self.set_option(SocketOption::RecoveryInterval(interval))
    }

    /// Whether multicast loopback is enabled.
    pub fn multicast_loop(&self) -> Result<bool> {
        self.get_bool(OptionName::MulticastLoop)
    }

    /// Enable or disable multicast loopback.
    pub fn set_multicast_loop(&self, enabled: bool) -> Result<()> {
        self.set_option(SocketOption::MulticastLoop(enabled))
    }

    /// Kernel send buffer size, 0 for the OS default.
    pub fn send_buffer_size(&self) -> Result<u64> {
        self.get_u64(OptionName::SendBufferSize)
    }

    /// Set the kernel send buffer size.
    pub fn set_send_buffer_size(&self, size: u64) -> Result<()> {
        self.set_option(SocketOption::SendBufferSize(size))
    }

    /// Kernel receive buffer size, 0 for the OS default.
    pub fn receive_buffer_size(&self) -> Result<u64> {
        self.get_u64(OptionName::ReceiveBufferSize)
    }

    /// Set the kernel receive buffer size.
    pub fn set_receive_buffer_size(&self, size: u64) -> Result<()> {
        self.set_option(SocketOption::ReceiveBufferSize(size))
    }

    /// Whether the last received frame has more parts after it.
    pub fn has_receive_more(&self) -> Result<bool> {
        self.get_bool(OptionName::ReceiveMore)
    }

    fn get_bool(&self, name: OptionName) -> Result<bool> {
        let value = self.get_option(name)?;
        value
            .as_bool()
            .ok_or_else(|| SockmuxError::invalid_option(format!("{name} is not boolean: {value:?}")))
    }

    /// Stream of lifecycle events for this socket.
    ///
    /// A later call replaces the previous monitor.
    pub fn monitor(&self) -> Result<SocketMonitor> {
        self.transport()?.monitor(self.handle)
    }

    /// Release the socket.
    ///
    /// Messages already queued toward peers stay deliverable. Calling it
    /// again, or after the context was terminated, is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if self.ctx.is_terminated() {
            return Ok(());
        }
        debug!(socket = %self.handle, socket_type = %self.socket_type, "closing socket");
        self.ctx.transport()?.close_socket(self.handle)
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!(socket = %self.handle, error = %e, "close on drop failed");
        }
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("handle", &self.handle)
            .field("socket_type", &self.socket_type)
            .field("closed", &self.is_closed())
            .finish()
    }
}
