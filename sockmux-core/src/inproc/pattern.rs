//! Per-pattern routing: where an outgoing message goes, which incoming
//! message is delivered next, and what readiness a socket reports.
//!
//! Everything here runs under the engine lock and never blocks; callers
//! decide whether to wait and retry.

use super::pipe::{frames_len, Frames, PipeId};
use super::state::{Dialog, EngineState, Route, SocketSlot};
use crate::error::{Result, SockmuxError};
use crate::flags::PollEvents;
use crate::socket_type::SocketType;
use crate::transport::SocketHandle;
use bytes::Bytes;
use tracing::{trace, warn};

/// Outcome of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendStatus {
    /// Accepted (queued, buffered as a non-final part, or dropped by pattern policy)
    Accepted,
    /// No room right now; nothing was changed
    Full,
}

/// Where a complete outgoing message goes.
enum Delivery {
    To { pipe: PipeId, cursor: Option<usize> },
    FanOut(Vec<PipeId>),
    Drop(&'static str),
    Full,
}

/// First position of the empty delimiter that ends a request envelope.
fn delimiter_at(frames: &[Bytes]) -> Option<usize> {
    frames
        .iter()
        .position(Bytes::is_empty)
        .filter(|&i| i + 1 < frames.len())
}

fn send_gate(slot: &SocketSlot, handle: SocketHandle) -> Result<()> {
    if !slot.socket_type.can_send() {
        return Err(SockmuxError::Unsupported {
            socket_type: slot.socket_type,
            operation: "send",
        });
    }
    match &slot.dialog {
        Dialog::ReqAwait(_) | Dialog::ReqDrain => Err(SockmuxError::state(format!(
            "{handle}: REQ socket must receive the reply before sending again"
        ))),
        Dialog::RepRecv | Dialog::RepDrain(_) => Err(SockmuxError::state(format!(
            "{handle}: REP socket has no request to reply to"
        ))),
        _ => Ok(()),
    }
}

fn recv_gate(slot: &SocketSlot, handle: SocketHandle) -> Result<()> {
    if !slot.socket_type.can_recv() {
        return Err(SockmuxError::Unsupported {
            socket_type: slot.socket_type,
            operation: "recv",
        });
    }
    match &slot.dialog {
        Dialog::ReqSend => Err(SockmuxError::state(format!(
            "{handle}: REQ socket must send a request before receiving"
        ))),
        Dialog::RepSend(_) => Err(SockmuxError::state(format!(
            "{handle}: REP socket must send the reply before receiving again"
        ))),
        _ => Ok(()),
    }
}

impl EngineState {
    /// Live pipes of `slot` in attachment order.
    fn live_pipes<'a>(&'a self, slot: &'a SocketSlot) -> impl Iterator<Item = PipeId> + 'a {
        slot.pipes
            .iter()
            .copied()
            .filter(move |id| self.pipes.get(id).map_or(false, |p| p.is_live()))
    }

    fn admits(&self, handle: SocketHandle, slot: &SocketSlot, pipe: PipeId, size: u64) -> bool {
        self.pipes.get(&pipe).map_or(false, |p| {
            p.is_live()
                && p.outbound(handle)
                    .admits(size, slot.options.hwm, slot.options.swap)
        })
    }

    /// Round-robin pick of the first live pipe with room, starting at the cursor.
    fn next_writable(&self, handle: SocketHandle, slot: &SocketSlot, size: u64) -> Option<(PipeId, usize)> {
        let count = slot.pipes.len();
        (0..count)
            .map(|step| (slot.out_cursor + step) % count)
            .map(|idx| (slot.pipes[idx], idx))
            .find(|(id, _)| self.admits(handle, slot, *id, size))
    }

    fn plan(&self, handle: SocketHandle, slot: &SocketSlot, msg: &Frames) -> Delivery {
        let size = frames_len(msg);
        match slot.socket_type {
            SocketType::Pair => match self.live_pipes(slot).next() {
                Some(pipe) if self.admits(handle, slot, pipe, size) => {
                    Delivery::To { pipe, cursor: None }
                }
                _ => Delivery::Full,
            },
            SocketType::Push | SocketType::XReq | SocketType::Req => {
                match self.next_writable(handle, slot, size) {
                    Some((pipe, idx)) => Delivery::To {
                        pipe,
                        cursor: Some(idx + 1),
                    },
                    None => Delivery::Full,
                }
            }
            SocketType::Pub => Delivery::FanOut(
                self.live_pipes(slot)
                    .filter(|id| self.admits(handle, slot, *id, size))
                    .collect(),
            ),
            SocketType::XRep => {
                let target = self.live_pipes(slot).find(|id| {
                    self.pipes
                        .get(id)
                        .map_or(false, |p| p.peer_identity(handle) == &msg[0])
                });
                match target {
                    Some(pipe) if self.admits(handle, slot, pipe, size) => {
                        Delivery::To { pipe, cursor: None }
                    }
                    Some(_) => Delivery::Drop("peer queue full"),
                    None => Delivery::Drop("unknown peer identity"),
                }
            }
            SocketType::Rep => match &slot.dialog {
                Dialog::RepSend(route) if self.admits(handle, slot, route.pipe, size) => {
                    Delivery::To {
                        pipe: route.pipe,
                        cursor: None,
                    }
                }
                _ => Delivery::Drop("requester gone or full"),
            },
            SocketType::Sub | SocketType::Pull => Delivery::Drop("receive-only pattern"),
        }
    }

    /// Offer frames to a socket.
    ///
    /// With `more` the frames extend the message under assembly; otherwise
    /// they complete it and the whole message is routed at once. A `Full`
    /// result leaves every queue and the assembly buffer untouched.
    pub(crate) fn try_send(
        &mut self,
        handle: SocketHandle,
        frames: &[Bytes],
        more: bool,
    ) -> Result<SendStatus> {
        let slot = self.slot(handle)?;
        if slot.outgoing.is_empty() {
            send_gate(slot, handle)?;
        }

        if more {
            let slot = self.slot_mut(handle)?;
            slot.outgoing.extend(frames.iter().cloned());
            trace!(socket = %handle, parts = slot.outgoing.len(), "frame buffered");
            return Ok(SendStatus::Accepted);
        }

        let mut msg: Frames = slot.outgoing.iter().cloned().collect();
        msg.extend(frames.iter().cloned());
        if slot.socket_type == SocketType::XRep && msg.len() < 2 {
            // Identity with no body: nothing to deliver.
            self.slot_mut(handle)?.outgoing.clear();
            return Ok(SendStatus::Accepted);
        }

        match self.plan(handle, slot, &msg) {
            Delivery::Full => return Ok(SendStatus::Full),
            Delivery::Drop(reason) => {
                warn!(socket = %handle, reason, "message dropped");
            }
            Delivery::FanOut(targets) => {
                let hwm = slot.options.hwm;
                for pipe in targets {
                    if let Some(p) = self.pipes.get_mut(&pipe) {
                        p.outbound_mut(handle).push(msg.clone(), hwm);
                    }
                }
            }
            Delivery::To { pipe, cursor } => {
                let hwm = slot.options.hwm;
                let msg = match (&slot.dialog, slot.socket_type) {
                    (_, SocketType::Req) => {
                        let mut wrapped = Frames::new();
                        wrapped.push(Bytes::new());
                        wrapped.extend(msg);
                        wrapped
                    }
                    (Dialog::RepSend(route), _) => {
                        let mut wrapped = route.envelope.clone();
                        wrapped.extend(msg);
                        wrapped
                    }
                    (_, SocketType::XRep) => msg.into_iter().skip(1).collect(),
                    _ => msg,
                };
                if let Some(p) = self.pipes.get_mut(&pipe) {
                    p.outbound_mut(handle).push(msg, hwm);
                }
                if let Some(next) = cursor {
                    self.slot_mut(handle)?.out_cursor = next;
                }
                trace!(socket = %handle, %pipe, "message queued");
                if self.slot(handle)?.socket_type == SocketType::Req {
                    self.slot_mut(handle)?.dialog = Dialog::ReqAwait(pipe);
                }
            }
        }

        let slot = self.slot_mut(handle)?;
        slot.outgoing.clear();
        if matches!(slot.dialog, Dialog::RepSend(_)) {
            slot.dialog = Dialog::RepRecv;
        }
        Ok(SendStatus::Accepted)
    }

    fn acceptable(slot: &SocketSlot, msg: &Frames) -> bool {
        match slot.socket_type {
            SocketType::Sub => slot.options.subscriptions.matches(&msg[0]),
            SocketType::Req => msg.len() >= 2 && msg[0].is_empty(),
            SocketType::Rep => delimiter_at(msg).is_some(),
            _ => true,
        }
    }

    /// Find the next pipe whose front message can be delivered to `handle`,
    /// discarding front messages the pattern would never deliver.
    fn next_readable(&mut self, handle: SocketHandle) -> Option<(PipeId, usize)> {
        let slot = self.sockets.get(&handle)?;
        let candidates: Vec<(PipeId, usize)> = match &slot.dialog {
            Dialog::ReqAwait(pipe) => slot
                .pipes
                .iter()
                .position(|p| p == pipe)
                .map(|idx| (*pipe, idx))
                .into_iter()
                .collect(),
            Dialog::ReqSend | Dialog::ReqDrain | Dialog::RepDrain(_) | Dialog::RepSend(_) => {
                Vec::new()
            }
            Dialog::Free | Dialog::RepRecv => {
                let count = slot.pipes.len();
                (0..count)
                    .map(|step| (slot.in_cursor + step) % count)
                    .map(|idx| (slot.pipes[idx], idx))
                    .collect()
            }
        };

        for (id, idx) in candidates {
            let Some(pipe) = self.pipes.get_mut(&id) else {
                continue;
            };
            let queue = pipe.inbound_mut(handle);
            while let Some(front) = queue.front() {
                if Self::acceptable(slot, front) {
                    return Some((id, idx));
                }
                trace!(socket = %handle, pipe = %id, "undeliverable message discarded");
                queue.pop();
                self.freed = true;
            }
        }
        None
    }

    /// Move the next deliverable message into the socket's receive buffer.
    fn fetch(&mut self, handle: SocketHandle) -> Result<bool> {
        let Some((id, idx)) = self.next_readable(handle) else {
            return Ok(false);
        };
        let Some(pipe) = self.pipes.get_mut(&id) else {
            return Ok(false);
        };
        let Some(msg) = pipe.inbound_mut(handle).pop() else {
            return Ok(false);
        };
        let identity = pipe.peer_identity(handle).clone();
        let drained_detached = !pipe.is_live() && pipe.inbound(handle).is_empty();

        let slot = self.slot_mut(handle)?;
        slot.in_cursor = idx + 1;
        match slot.socket_type {
            SocketType::XRep => {
                slot.incoming.push_back(identity);
                slot.incoming.extend(msg);
            }
            SocketType::Req => {
                slot.incoming.extend(msg.into_iter().skip(1));
                slot.dialog = Dialog::ReqDrain;
            }
            SocketType::Rep => {
                // `acceptable` guarantees a delimiter with a body after it.
                let split = delimiter_at(&msg).unwrap_or(0) + 1;
                let mut frames = msg.into_iter();
                let envelope: Frames = frames.by_ref().take(split).collect();
                slot.incoming.extend(frames);
                slot.dialog = Dialog::RepDrain(Route { pipe: id, envelope });
            }
            _ => slot.incoming.extend(msg),
        }

        if drained_detached {
            self.remove_pipe(id);
        }
        Ok(true)
    }

    /// Take the next frame, or `None` if nothing is deliverable now.
    pub(crate) fn try_recv(&mut self, handle: SocketHandle) -> Result<Option<Bytes>> {
        let slot = self.slot(handle)?;
        if slot.incoming.is_empty() {
            recv_gate(slot, handle)?;
            if !self.fetch(handle)? {
                return Ok(None);
            }
        }

        let slot = self.slot_mut(handle)?;
        let Some(frame) = slot.incoming.pop_front() else {
            return Ok(None);
        };
        slot.rcvmore = !slot.incoming.is_empty();
        if !slot.rcvmore {
            slot.dialog = match std::mem::replace(&mut slot.dialog, Dialog::Free) {
                Dialog::ReqDrain => Dialog::ReqSend,
                Dialog::RepDrain(route) => Dialog::RepSend(route),
                other => other,
            };
        }
        trace!(socket = %handle, len = frame.len(), more = slot.rcvmore, "frame received");
        Ok(Some(frame))
    }

    pub(crate) fn rcvmore(&self, handle: SocketHandle) -> Result<bool> {
        Ok(self.slot(handle)?.rcvmore)
    }

    fn is_readable(&mut self, handle: SocketHandle, slot_has_incoming: bool) -> bool {
        slot_has_incoming || self.next_readable(handle).is_some()
    }

    fn is_writable(&self, handle: SocketHandle, slot: &SocketSlot) -> bool {
        if slot.outgoing.is_empty() && send_gate(slot, handle).is_err() {
            return false;
        }
        let size = frames_len(&slot.outgoing);
        match slot.socket_type {
            SocketType::Pair => self
                .live_pipes(slot)
                .next()
                .map_or(false, |pipe| self.admits(handle, slot, pipe, size)),
            SocketType::Push | SocketType::XReq | SocketType::Req => {
                self.next_writable(handle, slot, size).is_some()
            }
            SocketType::Pub | SocketType::XRep | SocketType::Rep => true,
            SocketType::Sub | SocketType::Pull => false,
        }
    }

    /// Current readiness of a socket. Closed handles report `ERROR`.
    pub(crate) fn readiness(&mut self, handle: SocketHandle) -> PollEvents {
        let Some(slot) = self.sockets.get(&handle) else {
            return PollEvents::ERROR;
        };
        let can_recv = slot.socket_type.can_recv() && recv_gate(slot, handle).is_ok();
        let has_incoming = !slot.incoming.is_empty();
        let mut events = PollEvents::NONE;
        if self.is_writable(handle, slot) {
            events |= PollEvents::WRITABLE;
        }
        if (has_incoming || can_recv) && self.is_readable(handle, has_incoming) {
            events |= PollEvents::READABLE;
        }
        events
    }
}
