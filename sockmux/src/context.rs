//! Context: owner of a transport engine.

use crate::poller::Poller;
use crate::socket::Socket;
use sockmux_core::config::ContextConfig;
use sockmux_core::error::{Result, SockmuxError};
use sockmux_core::inproc::InprocTransport;
use sockmux_core::options::SocketOptions;
use sockmux_core::socket_type::SocketType;
use sockmux_core::transport::Transport;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// State shared by a context and everything created from it.
///
/// Sockets and pollers hold a strong reference, so the engine stays alive
/// while any of them exists; the context never tracks its children.
pub(crate) struct ContextInner {
    transport: Arc<dyn Transport>,
    terminated: AtomicBool,
}

impl ContextInner {
    /// The engine, unless the context has been terminated.
    pub(crate) fn transport(&self) -> Result<&dyn Transport> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(SockmuxError::lifecycle("context terminated"));
        }
        Ok(&*self.transport)
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    fn terminate(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transport.shutdown();
        debug!("context terminated");
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// A messaging context.
///
/// Owns the transport engine and its I/O sizing. Cloning is cheap and
/// yields another handle to the same engine.
///
/// ## Example
///
/// ```rust
/// use sockmux::{Context, RecvFlags, SendFlags, SocketType};
///
/// # fn main() -> sockmux::Result<()> {
/// let ctx = Context::new(1)?;
/// let push = ctx.socket(SocketType::Push)?;
/// let pull = ctx.socket(SocketType::Pull)?;
///
/// push.connect("inproc://work")?;
/// pull.bind("inproc://work")?;
///
/// push.send(&b"job"[..], SendFlags::NONE)?;
/// assert_eq!(pull.recv(RecvFlags::NONE)?.unwrap(), "job");
///
/// ctx.terminate();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Open a context backed by the built-in engine with `io_threads`
    /// I/O threads.
    ///
    /// Zero I/O threads is valid; such a context only serves `inproc://`
    /// endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`SockmuxError::Resource`] if the engine cannot be allocated.
    pub fn new(io_threads: usize) -> Result<Self> {
        Self::with_config(ContextConfig::new().with_io_threads(io_threads))
    }

    /// Open a context backed by the built-in engine sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SockmuxError::Resource`] if the engine cannot be allocated.
    pub fn with_config(config: ContextConfig) -> Result<Self> {
        let transport = InprocTransport::open(config)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Wrap an already opened transport engine.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        debug!(io_threads = transport.io_threads(), "context opened");
        Self {
            inner: Arc::new(ContextInner {
                transport,
                terminated: AtomicBool::new(false),
            }),
        }
    }

    /// Number of I/O threads the engine was opened with.
    pub fn io_threads(&self) -> usize {
        self.inner.transport.io_threads()
    }

    /// Create a socket with default options.
    ///
    /// # Errors
    ///
    /// [`SockmuxError::Lifecycle`] after [`terminate`](Self::terminate),
    /// [`SockmuxError::Resource`] when the engine's socket limit is reached.
    pub fn socket(&self, socket_type: SocketType) -> Result<Socket> {
        self.socket_with_options(socket_type, SocketOptions::default())
    }

    /// Create a socket with a whole option set applied up front.
    ///
    /// # Errors
    ///
    /// As [`socket`](Self::socket), plus [`SockmuxError::InvalidOption`]
    /// when `options` fails validation.
    pub fn socket_with_options(
        &self,
        socket_type: SocketType,
        options: SocketOptions,
    ) -> Result<Socket> {
        let handle = self.inner.transport()?.open_socket(socket_type, options)?;
        Ok(Socket::new(Arc::clone(&self.inner), handle, socket_type))
    }

    /// Create a poller with room for `capacity` registrations.
    ///
    /// # Errors
    ///
    /// [`SockmuxError::Lifecycle`] after [`terminate`](Self::terminate).
    pub fn poller(&self, capacity: usize) -> Result<Poller> {
        self.inner.transport()?;
        Ok(Poller::new(Arc::clone(&self.inner), capacity))
    }

    /// Release the engine.
    ///
    /// Blocked calls on sockets of this context return a lifecycle error;
    /// later calls fail the same way. Calling it again is a no-op.
    pub fn terminate(&self) {
        self.inner.terminate();
    }

    /// Whether [`terminate`](Self::terminate) has been called.
    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("io_threads", &self.io_threads())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_is_idempotent() {
        let ctx = Context::new(1).unwrap();
        ctx.terminate();
        ctx.terminate();
        assert!(ctx.is_terminated());
        assert!(ctx.socket(SocketType::Pair).unwrap_err().is_lifecycle());
        assert!(ctx.poller(1).unwrap_err().is_lifecycle());
    }

    #[test]
    fn test_clones_share_engine() {
        let ctx = Context::new(0).unwrap();
        let other = ctx.clone();
        assert_eq!(other.io_threads(), 0);

        other.terminate();
        assert!(ctx.is_terminated());
    }

    #[test]
    fn test_socket_limit_from_config() {
        let ctx = Context::with_config(ContextConfig::new().with_max_sockets(2)).unwrap();
        let _a = ctx.socket(SocketType::Pub).unwrap();
        let b = ctx.socket(SocketType::Sub).unwrap();
        assert!(matches!(
            ctx.socket(SocketType::Pair),
            Err(SockmuxError::Resource(_))
        ));

        drop(b);
        assert!(ctx.socket(SocketType::Pair).is_ok());
    }
}
