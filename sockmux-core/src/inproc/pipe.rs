//! Pipes: bidirectional message queues between two attached sockets.
//!
//! Invariants:
//! - Each direction is strictly FIFO and holds whole messages only
//! - A queue admits messages while below the sender's high water mark;
//!   beyond it, only while the overflow stays within the sender's swap budget
//! - Once one end closes the pipe is detached: nothing new is queued, the
//!   surviving end may still drain what was queued toward it

use crate::endpoint::Endpoint;
use crate::transport::SocketHandle;
use bytes::Bytes;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;

/// Frames of one logical message. Most messages have few parts.
pub(crate) type Frames = SmallVec<[Bytes; 4]>;

pub(crate) fn frames_len(frames: &[Bytes]) -> u64 {
    frames.iter().map(|f| f.len() as u64).sum()
}

/// Swap charge for an overflowed message; empty messages still cost a byte.
fn swap_cost(size: u64) -> u64 {
    size.max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PipeId(u64);

impl PipeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipe#{}", self.0)
    }
}

#[derive(Debug)]
struct Queued {
    frames: Frames,
    /// Bytes charged to the swap budget, zero for in-memory messages
    swapped: u64,
}

/// One direction of a pipe.
#[derive(Debug, Default)]
pub(crate) struct Queue {
    msgs: VecDeque<Queued>,
    swapped_bytes: u64,
}

impl Queue {
    pub(crate) fn len(&self) -> usize {
        self.msgs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }

    /// Whether a message of `size` bytes may be queued now.
    pub(crate) fn admits(&self, size: u64, hwm: u64, swap: u64) -> bool {
        if hwm == 0 || (self.msgs.len() as u64) < hwm {
            return true;
        }
        swap > 0 && self.swapped_bytes + swap_cost(size) <= swap
    }

    pub(crate) fn push(&mut self, frames: Frames, hwm: u64) {
        let swapped = if hwm != 0 && self.msgs.len() as u64 >= hwm {
            swap_cost(frames_len(&frames))
        } else {
            0
        };
        self.swapped_bytes += swapped;
        self.msgs.push_back(Queued { frames, swapped });
    }

    pub(crate) fn front(&self) -> Option<&Frames> {
        self.msgs.front().map(|q| &q.frames)
    }

    pub(crate) fn pop(&mut self) -> Option<Frames> {
        let queued = self.msgs.pop_front()?;
        self.swapped_bytes -= queued.swapped;
        Some(queued.frames)
    }

    pub(crate) fn clear(&mut self) {
        self.msgs.clear();
        self.swapped_bytes = 0;
    }
}

/// Attachment between a connecting socket and a binding socket.
#[derive(Debug)]
pub(crate) struct Pipe {
    pub(crate) endpoint: Endpoint,
    pub(crate) connecter: SocketHandle,
    pub(crate) binder: SocketHandle,
    connecter_identity: Bytes,
    binder_identity: Bytes,
    to_connecter: Queue,
    to_binder: Queue,
    closed_end: Option<SocketHandle>,
}

impl Pipe {
    pub(crate) fn new(
        endpoint: Endpoint,
        connecter: (SocketHandle, Bytes),
        binder: (SocketHandle, Bytes),
    ) -> Self {
        Self {
            endpoint,
            connecter: connecter.0,
            binder: binder.0,
            connecter_identity: connecter.1,
            binder_identity: binder.1,
            to_connecter: Queue::default(),
            to_binder: Queue::default(),
            closed_end: None,
        }
    }

    /// The end opposite to `me`.
    pub(crate) fn peer_of(&self, me: SocketHandle) -> SocketHandle {
        if me == self.connecter {
            self.binder
        } else {
            self.connecter
        }
    }

    /// Identity of the end opposite to `me`.
    pub(crate) fn peer_identity(&self, me: SocketHandle) -> &Bytes {
        if me == self.connecter {
            &self.binder_identity
        } else {
            &self.connecter_identity
        }
    }

    /// Queue of messages travelling toward `me`.
    pub(crate) fn inbound(&self, me: SocketHandle) -> &Queue {
        if me == self.connecter {
            &self.to_connecter
        } else {
            &self.to_binder
        }
    }

    pub(crate) fn inbound_mut(&mut self, me: SocketHandle) -> &mut Queue {
        if me == self.connecter {
            &mut self.to_connecter
        } else {
            &mut self.to_binder
        }
    }

    /// Queue of messages `me` sends toward its peer.
    pub(crate) fn outbound(&self, me: SocketHandle) -> &Queue {
        if me == self.connecter {
            &self.to_binder
        } else {
            &self.to_connecter
        }
    }

    pub(crate) fn outbound_mut(&mut self, me: SocketHandle) -> &mut Queue {
        if me == self.connecter {
            &mut self.to_binder
        } else {
            &mut self.to_connecter
        }
    }

    /// Both ends are open.
    pub(crate) fn is_live(&self) -> bool {
        self.closed_end.is_none()
    }

    pub(crate) fn detach(&mut self, closed: SocketHandle) {
        self.closed_end = Some(closed);
    }
}
