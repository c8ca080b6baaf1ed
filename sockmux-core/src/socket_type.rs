//! Socket type enumeration.
//!
//! Each socket is created with one fixed messaging pattern. The numeric
//! discriminants are the classic type codes (`PAIR = 0` through `PUSH = 8`).

use std::fmt;

/// Messaging pattern of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SocketType {
    /// PAIR socket for exclusive bidirectional communication
    Pair = 0,

    /// PUB socket for publishing messages to subscribers
    Pub = 1,

    /// SUB socket for subscribing to published messages
    Sub = 2,

    /// REQ socket for synchronous request-reply client
    Req = 3,

    /// REP socket for synchronous request-reply server
    Rep = 4,

    /// XREQ socket: raw request side, load-balanced and envelope-transparent
    XReq = 5,

    /// XREP socket: raw reply side, routes by peer identity
    XRep = 6,

    /// PULL socket for receiving messages from pushers
    Pull = 7,

    /// PUSH socket for distributing messages to pullers
    Push = 8,
}

impl SocketType {
    /// Deprecated name for [`SocketType::Pull`].
    pub const UPSTREAM: SocketType = SocketType::Pull;

    /// Deprecated name for [`SocketType::Push`].
    pub const DOWNSTREAM: SocketType = SocketType::Push;

    /// Get the socket type as a string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
            Self::Req => "REQ",
            Self::Rep => "REP",
            Self::XReq => "XREQ",
            Self::XRep => "XREP",
            Self::Pull => "PULL",
            Self::Push => "PUSH",
        }
    }

    /// Numeric type code.
    pub const fn code(&self) -> i32 {
        *self as i32
    }

    /// Check if this socket type is compatible with the given peer type.
    pub fn is_compatible(&self, peer: SocketType) -> bool {
        matches!(
            (self, peer),
            (Self::Pair, Self::Pair)
                | (Self::Pub, Self::Sub)
                | (Self::Sub, Self::Pub)
                | (Self::Req, Self::Rep)
                | (Self::Rep, Self::Req)
                | (Self::Req, Self::XRep)
                | (Self::XRep, Self::Req)
                | (Self::XReq, Self::Rep)
                | (Self::Rep, Self::XReq)
                | (Self::XReq, Self::XRep)
                | (Self::XRep, Self::XReq)
                | (Self::XReq, Self::XReq)
                | (Self::XRep, Self::XRep)
                | (Self::Push, Self::Pull)
                | (Self::Pull, Self::Push)
        )
    }

    /// Whether the pattern offers `send`.
    pub const fn can_send(&self) -> bool {
        !matches!(self, Self::Sub | Self::Pull)
    }

    /// Whether the pattern offers `recv`.
    pub const fn can_recv(&self) -> bool {
        !matches!(self, Self::Pub | Self::Push)
    }
}

impl TryFrom<i32> for SocketType {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::Pair,
            1 => Self::Pub,
            2 => Self::Sub,
            3 => Self::Req,
            4 => Self::Rep,
            5 => Self::XReq,
            6 => Self::XRep,
            7 => Self::Pull,
            8 => Self::Push,
            other => return Err(other),
        })
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
