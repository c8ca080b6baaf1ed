//! Endpoint abstraction for transport-agnostic socket addressing.
//!
//! Endpoints are parsed once at the `bind`/`connect` boundary so that a
//! malformed address is reported before anything reaches the transport.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::path::PathBuf;
use std::str::FromStr;

/// Transport endpoint address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// TCP transport: `tcp://host:port`, with `*` as the wildcard host
    Tcp {
        /// Host name or address literal, lowercased, IPv6 without brackets
        host: String,
        /// Port number
        port: u16,
    },
    /// IPC transport: `ipc:///path/to/socket`
    Ipc(PathBuf),
    /// In-process transport: `inproc://name`
    Inproc(String),
}

impl Endpoint {
    /// Parse an endpoint from a string.
    ///
    /// Supported formats:
    /// - `tcp://127.0.0.1:5555`
    /// - `tcp://[::1]:5555` (IPv6)
    /// - `tcp://localhost:5555` (host name)
    /// - `tcp://*:5555` (all interfaces)
    /// - `ipc:///tmp/socket.sock`
    /// - `inproc://name`
    ///
    /// # Examples
    ///
    /// ```
    /// use sockmux_core::endpoint::Endpoint;
    ///
    /// let endpoint = Endpoint::parse("tcp://127.0.0.1:5555").unwrap();
    /// assert!(matches!(endpoint, Endpoint::Tcp { port: 5555, .. }));
    ///
    /// let endpoint = Endpoint::parse("inproc://my-endpoint").unwrap();
    /// assert!(endpoint.is_inproc());
    /// ```
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        s.parse()
    }

    /// Returns true if this is a TCP endpoint.
    pub fn is_tcp(&self) -> bool {
        matches!(self, Endpoint::Tcp { .. })
    }

    /// Returns true if this is an IPC endpoint.
    pub fn is_ipc(&self) -> bool {
        matches!(self, Endpoint::Ipc(_))
    }

    /// Returns true if this is an inproc endpoint.
    pub fn is_inproc(&self) -> bool {
        matches!(self, Endpoint::Inproc(_))
    }

    /// Returns true if traffic on this endpoint is serviced by I/O threads.
    ///
    /// Only inproc endpoints work in a context without I/O threads.
    pub fn needs_io_thread(&self) -> bool {
        !self.is_inproc()
    }

    /// URI scheme of this endpoint.
    pub fn scheme(&self) -> &'static str {
        match self {
            Endpoint::Tcp { .. } => "tcp",
            Endpoint::Ipc(_) => "ipc",
            Endpoint::Inproc(_) => "inproc",
        }
    }

    /// Whether a connect to `target` reaches a socket bound at `self`.
    ///
    /// A wildcard TCP host accepts any host on the same port, and loopback
    /// spellings (`localhost`, `127.0.0.1`, `::1`) reach each other.
    pub fn accepts(&self, target: &Endpoint) -> bool {
        match (self, target) {
            (
                Endpoint::Tcp { host, port },
                Endpoint::Tcp {
                    host: to_host,
                    port: to_port,
                },
            ) => port == to_port && (is_wildcard(host) || same_host(host, to_host)),
            _ => self == target,
        }
    }

    /// Whether binding both endpoints in one context would collide.
    pub fn overlaps(&self, other: &Endpoint) -> bool {
        self.accepts(other) || other.accepts(self)
    }
}

fn is_wildcard(host: &str) -> bool {
    host == "*" || host.parse::<IpAddr>().map_or(false, |ip| ip.is_unspecified())
}

fn is_loopback(host: &str) -> bool {
    host == "localhost" || host.parse::<IpAddr>().map_or(false, |ip| ip.is_loopback())
}

fn same_host(a: &str, b: &str) -> bool {
    a == b || (is_loopback(a) && is_loopback(b))
}

fn is_hostname(host: &str) -> bool {
    host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

fn parse_tcp(addr: &str) -> Result<(String, u16), EndpointError> {
    let invalid = || EndpointError::InvalidTcpAddress(addr.to_string());
    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;

    let host = if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        inner.parse::<Ipv6Addr>().map_err(|_| invalid())?.to_string()
    } else if host == "*" || host.parse::<IpAddr>().is_ok() {
        // Bare IPv6 is ambiguous with the port separator.
        if host.contains(':') {
            return Err(invalid());
        }
        host.to_string()
    } else if is_hostname(host) {
        host.to_ascii_lowercase()
    } else {
        return Err(invalid());
    };
    Ok((host, port))
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(addr) = s.strip_prefix("tcp://") {
            let (host, port) = parse_tcp(addr)?;
            Ok(Endpoint::Tcp { host, port })
        } else if let Some(path) = s.strip_prefix("ipc://") {
            if path.is_empty() {
                Err(EndpointError::InvalidIpcPath(
                    "ipc path cannot be empty".to_string(),
                ))
            } else {
                Ok(Endpoint::Ipc(PathBuf::from(path)))
            }
        } else if let Some(name) = s.strip_prefix("inproc://") {
            if name.is_empty() {
                Err(EndpointError::InvalidInprocName(
                    "inproc name cannot be empty".to_string(),
                ))
            } else {
                Ok(Endpoint::Inproc(name.to_string()))
            }
        } else {
            Err(EndpointError::InvalidScheme(s.to_string()))
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => {
                write!(f, "{}://[{}]:{}", self.scheme(), host, port)
            }
            Endpoint::Tcp { host, port } => write!(f, "{}://{}:{}", self.scheme(), host, port),
            Endpoint::Ipc(path) => write!(f, "{}://{}", self.scheme(), path.display()),
            Endpoint::Inproc(name) => write!(f, "{}://{}", self.scheme(), name),
        }
    }
}

/// Errors that can occur when parsing endpoints.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Invalid scheme in endpoint: {0} (expected tcp://, ipc://, or inproc://)")]
    InvalidScheme(String),

    #[error("Invalid TCP address: {0}")]
    InvalidTcpAddress(String),

    #[error("Invalid IPC path: {0}")]
    InvalidIpcPath(String),

    #[error("Invalid inproc name: {0}")]
    InvalidInprocName(String),
}
