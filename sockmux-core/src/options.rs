//! Socket configuration options
//!
//! The option table of a socket, in two shapes:
//!
//! - [`SocketOptions`]: the whole table as a plain struct with builder
//!   methods, used to configure a socket at creation time.
//! - [`SocketOption`] / [`OptionName`] / [`OptionValue`]: the tagged form
//!   used by `set_option`/`get_option`, validated at the API boundary.

use crate::error::{Result, SockmuxError};
use crate::subscription::SubscriptionSet;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;

/// Maximum identity length in bytes.
pub const MAX_IDENTITY_LEN: usize = 255;

/// Socket configuration options.
///
/// # Examples
///
/// ```
/// use sockmux_core::options::SocketOptions;
///
/// let opts = SocketOptions::default()
///     .with_hwm(1000)
///     .with_identity("worker-01")
///     .with_subscription("weather.");
/// assert_eq!(opts.hwm, 1000);
/// ```
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// High water mark
    ///
    /// Maximum number of outstanding messages queued per peer.
    /// - Default: 0 (no limit)
    pub hwm: u64,

    /// Swap size in bytes
    ///
    /// Overflow capacity used once the high water mark is reached.
    /// - Default: 0 (no overflow)
    pub swap: u64,

    /// I/O thread affinity bitmask
    ///
    /// Lowest bit is I/O thread 1. Zero spreads connections over all threads.
    pub affinity: u64,

    /// Persistent peer identity (0-255 bytes, empty means none)
    pub identity: Bytes,

    /// Message filters, meaningful for SUB sockets only
    pub subscriptions: SubscriptionSet,

    /// Multicast data rate in kilobits per second
    /// - Default: 100
    pub rate: u64,

    /// Multicast recovery interval
    /// - Default: 10 seconds
    pub recovery_ivl: Duration,

    /// Multicast loopback
    /// - Default: true
    pub mcast_loop: bool,

    /// Kernel transmit buffer size in bytes
    /// - Default: 0 (OS default)
    pub sndbuf: u64,

    /// Kernel receive buffer size in bytes
    /// - Default: 0 (OS default)
    pub rcvbuf: u64,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            hwm: 0,  // No limit
            swap: 0, // No overflow
            affinity: 0,
            identity: Bytes::new(),
            subscriptions: SubscriptionSet::new(),
            rate: 100,
            recovery_ivl: Duration::from_secs(10),
            mcast_loop: true,
            sndbuf: 0, // OS default
            rcvbuf: 0, // OS default
        }
    }
}

impl SocketOptions {
    /// Create new socket options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set high water mark.
    pub fn with_hwm(mut self, hwm: u64) -> Self {
        self.hwm = hwm;
        self
    }

    /// Set swap size in bytes.
    pub fn with_swap(mut self, swap: u64) -> Self {
        self.swap = swap;
        self
    }

    /// Set I/O thread affinity.
    pub fn with_affinity(mut self, affinity: u64) -> Self {
        self.affinity = affinity;
        self
    }

    /// Set socket identity.
    ///
    /// The value is checked when the options are applied to a socket.
    pub fn with_identity(mut self, identity: impl Into<Bytes>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Add a subscription prefix.
    pub fn with_subscription(mut self, prefix: impl Into<Bytes>) -> Self {
        self.subscriptions.subscribe(prefix.into());
        self
    }

    /// Set multicast rate.
    pub fn with_rate(mut self, rate: u64) -> Self {
        self.rate = rate;
        self
    }

    /// Set multicast recovery interval.
    pub fn with_recovery_ivl(mut self, ivl: Duration) -> Self {
        self.recovery_ivl = ivl;
        self
    }

    /// Enable or disable multicast loopback.
    pub fn with_mcast_loop(mut self, enabled: bool) -> Self {
        self.mcast_loop = enabled;
        self
    }

    /// Set kernel send buffer size.
    pub fn with_sndbuf(mut self, size: u64) -> Self {
        self.sndbuf = size;
        self
    }

    /// Set kernel receive buffer size.
    pub fn with_rcvbuf(mut self, size: u64) -> Self {
        self.rcvbuf = size;
        self
    }

    /// Validate a socket identity.
    ///
    /// Identities must:
    /// - Be at most 255 bytes long
    /// - Not start with a null byte (0x00), reserved for generated identities
    ///
    /// An empty identity means "no identity".
    pub fn validate_identity(id: &[u8]) -> Result<()> {
        if id.len() > MAX_IDENTITY_LEN {
            return Err(SockmuxError::invalid_option(format!(
                "identity cannot exceed {MAX_IDENTITY_LEN} bytes (got {})",
                id.len()
            )));
        }

        if id.first() == Some(&0x00) {
            return Err(SockmuxError::invalid_option(
                "identity cannot start with null byte (reserved for generated identities)",
            ));
        }

        Ok(())
    }

    /// Check every field that has constraints.
    pub fn validate(&self) -> Result<()> {
        Self::validate_identity(&self.identity)
    }

    /// Apply one tagged option.
    ///
    /// Fails without mutating anything when the value is rejected.
    pub fn apply(&mut self, option: SocketOption) -> Result<()> {
        match option {
            SocketOption::Hwm(v) => self.hwm = v,
            SocketOption::Swap(v) => self.swap = v,
            SocketOption::Affinity(v) => self.affinity = v,
            SocketOption::Identity(id) => {
                Self::validate_identity(&id)?;
                self.identity = id;
            }
            SocketOption::Subscribe(prefix) => self.subscriptions.subscribe(prefix),
            SocketOption::Unsubscribe(prefix) => {
                if !self.subscriptions.unsubscribe(&prefix) {
                    return Err(SockmuxError::invalid_option(format!(
                        "no subscription matches prefix {:?}",
                        prefix
                    )));
                }
            }
            SocketOption::Rate(v) => self.rate = v,
            SocketOption::RecoveryInterval(v) => self.recovery_ivl = v,
            SocketOption::MulticastLoop(v) => self.mcast_loop = v,
            SocketOption::SendBufferSize(v) => self.sndbuf = v,
            SocketOption::ReceiveBufferSize(v) => self.rcvbuf = v,
        }
        Ok(())
    }

    /// Read one option from the table.
    ///
    /// Returns `None` for [`OptionName::ReceiveMore`], which is framing
    /// state owned by the transport rather than a configured value.
    pub fn get(&self, name: OptionName) -> Option<OptionValue> {
        Some(match name {
            OptionName::Hwm => OptionValue::U64(self.hwm),
            OptionName::Swap => OptionValue::U64(self.swap),
            OptionName::Affinity => OptionValue::U64(self.affinity),
            OptionName::Identity => OptionValue::Bytes(self.identity.clone()),
            OptionName::Rate => OptionValue::U64(self.rate),
            OptionName::RecoveryInterval => OptionValue::Duration(self.recovery_ivl),
            OptionName::MulticastLoop => OptionValue::Bool(self.mcast_loop),
            OptionName::SendBufferSize => OptionValue::U64(self.sndbuf),
            OptionName::ReceiveBufferSize => OptionValue::U64(self.rcvbuf),
            OptionName::ReceiveMore => return None,
        })
    }
}

/// A typed option assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketOption {
    Hwm(u64),
    Swap(u64),
    Affinity(u64),
    Identity(Bytes),
    /// Add a message filter; an empty prefix matches every message.
    Subscribe(Bytes),
    /// Remove one instance of a previously added filter.
    Unsubscribe(Bytes),
    Rate(u64),
    RecoveryInterval(Duration),
    MulticastLoop(bool),
    SendBufferSize(u64),
    ReceiveBufferSize(u64),
}

impl SocketOption {
    /// Whether this assignment edits the subscription filters.
    pub fn is_subscription(&self) -> bool {
        matches!(self, Self::Subscribe(_) | Self::Unsubscribe(_))
    }
}

/// Readable option keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    Hwm,
    Swap,
    Affinity,
    Identity,
    Rate,
    RecoveryInterval,
    MulticastLoop,
    SendBufferSize,
    ReceiveBufferSize,
    /// Read-only: the last received frame has more parts to follow.
    ReceiveMore,
}

impl OptionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hwm => "HWM",
            Self::Swap => "SWAP",
            Self::Affinity => "AFFINITY",
            Self::Identity => "IDENTITY",
            Self::Rate => "RATE",
            Self::RecoveryInterval => "RECOVERY_IVL",
            Self::MulticastLoop => "MCAST_LOOP",
            Self::SendBufferSize => "SNDBUF",
            Self::ReceiveBufferSize => "RCVBUF",
            Self::ReceiveMore => "RCVMORE",
        }
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value read back from a socket option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    U64(u64),
    Bool(bool),
    Bytes(Bytes),
    Duration(Duration),
}

impl OptionValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(v) => Some(*v),
            _ => None,
        }
    }
}
