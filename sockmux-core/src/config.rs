//! Context configuration
//!
//! Sizing of the I/O subsystem owned by a context.

/// Default number of I/O threads.
pub const DEFAULT_IO_THREADS: usize = 1;

/// Default ceiling on concurrently open sockets per context.
pub const DEFAULT_MAX_SOCKETS: usize = 512;

/// Context configuration.
///
/// # Examples
///
/// ```
/// use sockmux_core::config::ContextConfig;
///
/// let config = ContextConfig::new().with_io_threads(2).with_max_sockets(64);
/// assert_eq!(config.io_threads, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Number of I/O worker threads
    ///
    /// Zero is valid and restricts the context to inproc endpoints.
    pub io_threads: usize,

    /// Maximum number of sockets open at once
    pub max_sockets: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            max_sockets: DEFAULT_MAX_SOCKETS,
        }
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the I/O thread count.
    pub fn with_io_threads(mut self, io_threads: usize) -> Self {
        self.io_threads = io_threads;
        self
    }

    /// Set the socket ceiling.
    pub fn with_max_sockets(mut self, max_sockets: usize) -> Self {
        self.max_sockets = max_sockets;
        self
    }
}
