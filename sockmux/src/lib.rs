//! # Sockmux
//!
//! A socket-oriented messaging API: contexts, pattern-typed sockets with
//! multi-part framing and typed options, and a fixed-capacity poller.
//!
//! ## Architecture
//!
//! - **`sockmux-core`**: socket types, endpoints, options, flags, the
//!   [`Transport`] abstraction and the built-in [`InprocTransport`] engine
//! - **`sockmux`**: public API surface (this crate)
//!
//! Every call is synchronous. `send` and `recv` block unless
//! [`SendFlags::NOBLOCK`] / [`RecvFlags::NOBLOCK`] is given; [`Poller`]
//! waits at most its timeout.
//!
//! ## Quick Start
//!
//! ```rust
//! use sockmux::{Context, RecvFlags, SendFlags, SocketType};
//!
//! # fn main() -> sockmux::Result<()> {
//! let ctx = Context::new(1)?;
//!
//! let rep = ctx.socket(SocketType::Rep)?;
//! rep.bind("inproc://echo")?;
//! let req = ctx.socket(SocketType::Req)?;
//! req.connect("inproc://echo")?;
//!
//! req.send(&b"hello"[..], SendFlags::NONE)?;
//! let request = rep.recv(RecvFlags::NONE)?.unwrap();
//! rep.send(request, SendFlags::NONE)?;
//! assert_eq!(req.recv(RecvFlags::NONE)?.unwrap(), "hello");
//! # Ok(())
//! # }
//! ```
//!
//! ## Socket Types
//!
//! | Type | Sends | Receives |
//! |---|---|---|
//! | PAIR | to its single peer | from its single peer |
//! | PUB / SUB | fan-out, never blocks | prefix-filtered |
//! | REQ / REP | strict request/reply alternation | |
//! | XREQ | round-robin | fair-queued |
//! | XREP | routed by identity frame | identity frame prepended |
//! | PUSH / PULL | round-robin | fair-queued |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
pub mod dev_tracing;
mod poller;
mod socket;

pub use context::Context;
pub use poller::Poller;
pub use socket::Socket;

// Re-export core types
pub use bytes::Bytes;
pub use sockmux_core::config::ContextConfig;
pub use sockmux_core::endpoint::{Endpoint, EndpointError};
pub use sockmux_core::error::{Result, SockmuxError};
pub use sockmux_core::flags::{PollEvents, RecvFlags, SendFlags};
pub use sockmux_core::inproc::InprocTransport;
pub use sockmux_core::message::Message;
pub use sockmux_core::monitor::{SocketEvent, SocketMonitor};
pub use sockmux_core::options::{OptionName, OptionValue, SocketOption, SocketOptions};
pub use sockmux_core::socket_type::SocketType;
pub use sockmux_core::transport::{PollItem, SocketHandle, Transport};

/// Common imports.
pub mod prelude {
    pub use crate::{
        Context, Message, OptionName, PollEvents, Poller, RecvFlags, SendFlags, Socket,
        SocketOption, SocketType,
    };
}
