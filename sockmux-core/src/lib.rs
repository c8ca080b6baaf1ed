//! Sockmux Core
//!
//! This crate contains the runtime-agnostic building blocks behind the
//! `sockmux` API:
//! - Socket types and their pairing rules (`socket_type`)
//! - Endpoint parsing (`endpoint`)
//! - Typed socket options and prefix subscriptions (`options`, `subscription`)
//! - Send/recv/poll flag sets (`flags`)
//! - Multipart messages (`message`)
//! - The transport abstraction and the in-process engine (`transport`, `inproc`)
//! - Lifecycle event streams (`monitor`)
//! - Error types (`error`)

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
pub mod config;
pub mod endpoint;
pub mod error;
pub mod flags;
pub mod inproc;
pub mod message;
pub mod monitor;
pub mod options;
pub mod socket_type;
pub mod subscription;
pub mod transport;

// Optional: a small prelude to make downstream crates ergonomic.
// Keep it minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::config::ContextConfig;
    pub use crate::endpoint::Endpoint;
    pub use crate::error::{Result, SockmuxError};
    pub use crate::flags::{PollEvents, RecvFlags, SendFlags};
    pub use crate::inproc::InprocTransport;
    pub use crate::message::Message;
    pub use crate::monitor::{SocketEvent, SocketMonitor};
    pub use crate::options::{OptionName, OptionValue, SocketOption, SocketOptions};
    pub use crate::socket_type::SocketType;
    pub use crate::transport::{PollItem, SocketHandle, Transport};
}
