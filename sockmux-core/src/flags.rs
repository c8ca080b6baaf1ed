//! Flag sets for send, receive and poll operations.
//!
//! Bit values match the classic constants (`NOBLOCK = 1`, `SNDMORE = 2`,
//! `POLLIN = 1`, `POLLOUT = 2`, `POLLERR = 4`).

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Flags accepted by `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SendFlags {
    bits: u8,
}

impl SendFlags {
    /// Blocking send of a final frame.
    pub const NONE: Self = Self { bits: 0 };
    /// Return immediately instead of blocking when the queue is full.
    pub const NOBLOCK: Self = Self { bits: 1 };
    /// More frames of the same message follow.
    pub const SNDMORE: Self = Self { bits: 2 };

    /// Build from raw bits, ignoring unknown ones.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self { bits: bits & 0b11 }
    }

    pub const fn bits(&self) -> u8 {
        self.bits
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }

    pub const fn is_nonblocking(&self) -> bool {
        self.contains(Self::NOBLOCK)
    }

    pub const fn has_more(&self) -> bool {
        self.contains(Self::SNDMORE)
    }
}

impl BitOr for SendFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

/// Flags accepted by `recv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RecvFlags {
    bits: u8,
}

impl RecvFlags {
    /// Block until a frame arrives.
    pub const NONE: Self = Self { bits: 0 };
    /// Return `None` immediately when nothing is available.
    pub const NOBLOCK: Self = Self { bits: 1 };

    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self { bits: bits & 0b1 }
    }

    pub const fn bits(&self) -> u8 {
        self.bits
    }

    pub const fn is_nonblocking(&self) -> bool {
        self.bits & Self::NOBLOCK.bits != 0
    }
}

/// Readiness conditions: the interest mask of a poll registration and
/// the result mask reported by a poll.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PollEvents {
    bits: u8,
}

impl PollEvents {
    pub const NONE: Self = Self { bits: 0 };
    /// A frame can be received without blocking.
    pub const READABLE: Self = Self { bits: 1 };
    /// A frame can be sent without blocking.
    pub const WRITABLE: Self = Self { bits: 2 };
    /// The registration is in an error condition.
    pub const ERROR: Self = Self { bits: 4 };
    /// Default interest mask of a registration.
    pub const ALL: Self = Self { bits: 7 };

    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self { bits: bits & 0b111 }
    }

    pub const fn bits(&self) -> u8 {
        self.bits
    }

    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        other.bits != 0 && self.bits & other.bits == other.bits
    }

    pub const fn is_readable(&self) -> bool {
        self.contains(Self::READABLE)
    }

    pub const fn is_writable(&self) -> bool {
        self.contains(Self::WRITABLE)
    }

    pub const fn is_error(&self) -> bool {
        self.contains(Self::ERROR)
    }
}

impl BitOr for PollEvents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl BitOrAssign for PollEvents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

impl BitAnd for PollEvents {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self {
            bits: self.bits & rhs.bits,
        }
    }
}

impl fmt::Debug for PollEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::with_capacity(3);
        if self.is_readable() {
            names.push("READABLE");
        }
        if self.is_writable() {
            names.push("WRITABLE");
        }
        if self.is_error() {
            names.push("ERROR");
        }
        if names.is_empty() {
            f.write_str("PollEvents(NONE)")
        } else {
            write!(f, "PollEvents({})", names.join(" | "))
        }
    }
}
