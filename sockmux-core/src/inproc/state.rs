//! Engine bookkeeping: socket slots, endpoint registry and pipe attachment.

use super::pipe::{Frames, Pipe, PipeId};
use crate::config::ContextConfig;
use crate::endpoint::Endpoint;
use crate::error::{Result, SockmuxError};
use crate::monitor::{SocketEvent, SocketEventSender};
use crate::options::SocketOptions;
use crate::socket_type::SocketType;
use crate::transport::SocketHandle;
use bytes::Bytes;
use hashbrown::HashMap;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Reply routing captured from a received request.
#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub(crate) pipe: PipeId,
    pub(crate) envelope: Frames,
}

/// Send/recv alternation of REQ and REP sockets.
#[derive(Debug, Clone)]
pub(crate) enum Dialog {
    /// No alternation is enforced.
    Free,
    /// REQ may send a request.
    ReqSend,
    /// REQ sent a request on this pipe and waits for the reply.
    ReqAwait(PipeId),
    /// REQ is draining the parts of a reply.
    ReqDrain,
    /// REP may receive a request.
    RepRecv,
    /// REP is draining the parts of a request.
    RepDrain(Route),
    /// REP owes a reply along this route.
    RepSend(Route),
}

impl Dialog {
    fn initial(socket_type: SocketType) -> Self {
        match socket_type {
            SocketType::Req => Self::ReqSend,
            SocketType::Rep => Self::RepRecv,
            _ => Self::Free,
        }
    }
}

#[derive(Debug)]
pub(crate) struct SocketSlot {
    pub(crate) socket_type: SocketType,
    pub(crate) options: SocketOptions,
    /// Attached pipes in attachment order
    pub(crate) pipes: Vec<PipeId>,
    /// Round-robin position for outgoing load balancing
    pub(crate) out_cursor: usize,
    /// Fair-queue position for incoming messages
    pub(crate) in_cursor: usize,
    /// Frames of the message being assembled with SNDMORE
    pub(crate) outgoing: Frames,
    /// Remaining frames of the message being received
    pub(crate) incoming: VecDeque<Bytes>,
    pub(crate) rcvmore: bool,
    pub(crate) dialog: Dialog,
    pub(crate) bound: Vec<Endpoint>,
    pub(crate) connected: Vec<Endpoint>,
    pub(crate) monitor: Option<SocketEventSender>,
}

impl SocketSlot {
    fn new(socket_type: SocketType, options: SocketOptions) -> Self {
        Self {
            socket_type,
            options,
            pipes: Vec::new(),
            out_cursor: 0,
            in_cursor: 0,
            outgoing: Frames::new(),
            incoming: VecDeque::new(),
            rcvmore: false,
            dialog: Dialog::initial(socket_type),
            bound: Vec::new(),
            connected: Vec::new(),
            monitor: None,
        }
    }

    pub(crate) fn emit(&self, event: SocketEvent) {
        if let Some(tx) = &self.monitor {
            // Monitor dropped by the application: nothing to report to.
            let _ = tx.send(event);
        }
    }
}

#[derive(Debug)]
pub(crate) struct EngineState {
    pub(crate) io_threads: usize,
    pub(crate) max_sockets: usize,
    pub(crate) terminated: bool,
    /// Queue room was released without a send or recv completing
    pub(crate) freed: bool,
    next_socket: u64,
    next_pipe: u64,
    next_identity: u32,
    pub(crate) sockets: HashMap<SocketHandle, SocketSlot>,
    pub(crate) pipes: HashMap<PipeId, Pipe>,
    /// Bound endpoints; no two overlap
    endpoints: HashMap<Endpoint, SocketHandle>,
    /// Connect targets with no reachable binder yet
    pending: HashMap<Endpoint, Vec<SocketHandle>>,
}

impl EngineState {
    pub(crate) fn new(config: ContextConfig) -> Self {
        Self {
            io_threads: config.io_threads,
            max_sockets: config.max_sockets,
            terminated: false,
            freed: false,
            next_socket: 1,
            next_pipe: 1,
            next_identity: 1,
            sockets: HashMap::new(),
            pipes: HashMap::new(),
            endpoints: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub(crate) fn ensure_running(&self) -> Result<()> {
        if self.terminated {
            return Err(SockmuxError::lifecycle("context terminated"));
        }
        Ok(())
    }

    pub(crate) fn slot(&self, handle: SocketHandle) -> Result<&SocketSlot> {
        self.sockets
            .get(&handle)
            .ok_or_else(|| SockmuxError::lifecycle(format!("{handle} is closed")))
    }

    pub(crate) fn slot_mut(&mut self, handle: SocketHandle) -> Result<&mut SocketSlot> {
        self.sockets
            .get_mut(&handle)
            .ok_or_else(|| SockmuxError::lifecycle(format!("{handle} is closed")))
    }

    pub(crate) fn open(
        &mut self,
        socket_type: SocketType,
        options: SocketOptions,
    ) -> Result<SocketHandle> {
        if self.sockets.len() >= self.max_sockets {
            return Err(SockmuxError::resource(format!(
                "socket limit of {} reached",
                self.max_sockets
            )));
        }
        options.validate()?;

        let handle = SocketHandle::new(self.next_socket);
        self.next_socket += 1;
        self.sockets
            .insert(handle, SocketSlot::new(socket_type, options));
        debug!(socket = %handle, %socket_type, "socket opened");
        Ok(handle)
    }

    fn check_io_thread(&self, endpoint: &Endpoint) -> Result<()> {
        if endpoint.needs_io_thread() && self.io_threads == 0 {
            return Err(SockmuxError::resource(format!(
                "no I/O thread available for {endpoint}"
            )));
        }
        Ok(())
    }

    pub(crate) fn bind(&mut self, handle: SocketHandle, endpoint: &Endpoint) -> Result<()> {
        self.slot(handle)?;
        self.check_io_thread(endpoint)?;

        if let Some(holder) = self.binder_where(|bound| bound.overlaps(endpoint)) {
            let reason = format!("already bound by {holder}");
            self.slot(handle)?.emit(SocketEvent::BindFailed {
                endpoint: endpoint.clone(),
                reason: reason.clone(),
            });
            return Err(SockmuxError::bind(endpoint.clone(), reason));
        }

        self.endpoints.insert(endpoint.clone(), handle);
        let slot = self.slot_mut(handle)?;
        slot.bound.push(endpoint.clone());
        slot.emit(SocketEvent::Bound(endpoint.clone()));
        debug!(socket = %handle, %endpoint, "bound");

        let reachable: Vec<Endpoint> = self
            .pending
            .keys()
            .filter(|target| endpoint.accepts(target))
            .cloned()
            .collect();
        for target in reachable {
            for connecter in self.pending.remove(&target).unwrap_or_default() {
                self.attach(connecter, handle, &target);
            }
        }
        Ok(())
    }

    pub(crate) fn connect(&mut self, handle: SocketHandle, endpoint: &Endpoint) -> Result<()> {
        self.slot(handle)?;
        self.check_io_thread(endpoint)?;

        self.slot_mut(handle)?.connected.push(endpoint.clone());
        match self.binder_where(|bound| bound.accepts(endpoint)) {
            Some(binder) => self.attach(handle, binder, endpoint),
            None => self.park(handle, endpoint),
        }
        debug!(socket = %handle, %endpoint, "connect requested");
        Ok(())
    }

    /// Socket holding the first bound endpoint that satisfies `pred`.
    fn binder_where(&self, pred: impl Fn(&Endpoint) -> bool) -> Option<SocketHandle> {
        self.endpoints
            .iter()
            .find(|(bound, _)| pred(bound))
            .map(|(_, holder)| *holder)
    }

    fn park(&mut self, connecter: SocketHandle, endpoint: &Endpoint) {
        self.pending
            .entry(endpoint.clone())
            .or_default()
            .push(connecter);
        if let Some(slot) = self.sockets.get(&connecter) {
            slot.emit(SocketEvent::ConnectDelayed(endpoint.clone()));
        }
    }

    fn refuse(&self, connecter: SocketHandle, endpoint: &Endpoint, reason: String) {
        warn!(socket = %connecter, %endpoint, %reason, "peer attachment refused");
        if let Some(slot) = self.sockets.get(&connecter) {
            slot.emit(SocketEvent::ConnectFailed {
                endpoint: endpoint.clone(),
                reason,
            });
        }
    }

    fn has_live_pipe(&self, handle: SocketHandle) -> bool {
        self.sockets.get(&handle).map_or(false, |slot| {
            slot.pipes
                .iter()
                .any(|id| self.pipes.get(id).map_or(false, Pipe::is_live))
        })
    }

    /// Identity a socket presents to a new peer.
    fn identity_for(&mut self, handle: SocketHandle) -> Bytes {
        let configured = self
            .sockets
            .get(&handle)
            .map(|slot| slot.options.identity.clone())
            .unwrap_or_default();
        if !configured.is_empty() {
            return configured;
        }
        // Generated identities start with a zero byte, which user
        // identities may not.
        let n = self.next_identity;
        self.next_identity = self.next_identity.wrapping_add(1);
        let mut id = Vec::with_capacity(5);
        id.push(0);
        id.extend_from_slice(&n.to_be_bytes());
        Bytes::from(id)
    }

    fn attach(&mut self, connecter: SocketHandle, binder: SocketHandle, endpoint: &Endpoint) {
        let (Some(c), Some(b)) = (self.sockets.get(&connecter), self.sockets.get(&binder)) else {
            return;
        };
        let (ctype, btype) = (c.socket_type, b.socket_type);

        if connecter == binder {
            self.refuse(connecter, endpoint, "socket cannot connect to itself".into());
            return;
        }
        if !ctype.is_compatible(btype) {
            self.refuse(
                connecter,
                endpoint,
                format!("{ctype} cannot talk to {btype}"),
            );
            return;
        }
        if ctype == SocketType::Pair && (self.has_live_pipe(connecter) || self.has_live_pipe(binder))
        {
            self.refuse(connecter, endpoint, "PAIR socket already has a peer".into());
            return;
        }

        let id = PipeId::new(self.next_pipe);
        self.next_pipe += 1;
        let connecter_identity = self.identity_for(connecter);
        let binder_identity = self.identity_for(binder);
        self.pipes.insert(
            id,
            Pipe::new(
                endpoint.clone(),
                (connecter, connecter_identity),
                (binder, binder_identity),
            ),
        );

        if let Some(slot) = self.sockets.get_mut(&connecter) {
            slot.pipes.push(id);
            slot.emit(SocketEvent::Connected(endpoint.clone()));
        }
        if let Some(slot) = self.sockets.get_mut(&binder) {
            slot.pipes.push(id);
            slot.emit(SocketEvent::Accepted(endpoint.clone()));
        }
        debug!(%id, %connecter, %binder, %endpoint, "pipe attached");
    }

    /// Drop a pipe from the engine and from both ends' slots.
    pub(crate) fn remove_pipe(&mut self, id: PipeId) {
        if let Some(pipe) = self.pipes.remove(&id) {
            for end in [pipe.connecter, pipe.binder] {
                if let Some(slot) = self.sockets.get_mut(&end) {
                    slot.pipes.retain(|p| *p != id);
                }
            }
        }
    }

    pub(crate) fn close(&mut self, handle: SocketHandle) {
        let Some(slot) = self.sockets.remove(&handle) else {
            return;
        };

        for endpoint in &slot.bound {
            self.endpoints.remove(endpoint);
        }
        for waiting in self.pending.values_mut() {
            waiting.retain(|h| *h != handle);
        }
        self.pending.retain(|_, waiting| !waiting.is_empty());

        for id in &slot.pipes {
            let Some(pipe) = self.pipes.get_mut(id) else {
                continue;
            };
            let peer = pipe.peer_of(handle);
            let endpoint = pipe.endpoint.clone();
            let was_binder = pipe.binder == handle;
            pipe.inbound_mut(handle).clear();

            if pipe.is_live() && !pipe.outbound(handle).is_empty() {
                // Peer may still drain what we queued for it.
                pipe.detach(handle);
            } else {
                self.remove_pipe(*id);
            }

            let reconnect = match self.sockets.get(&peer) {
                Some(peer_slot) => {
                    peer_slot.emit(SocketEvent::Disconnected(endpoint.clone()));
                    was_binder && peer_slot.connected.contains(&endpoint)
                }
                None => false,
            };
            if reconnect {
                self.park(peer, &endpoint);
            }
        }

        slot.emit(SocketEvent::Closed);
        debug!(socket = %handle, socket_type = %slot.socket_type, "socket closed");
    }

    /// Release everything; later calls fail with a lifecycle error.
    pub(crate) fn terminate(&mut self) {
        self.terminated = true;
        for slot in self.sockets.values() {
            slot.emit(SocketEvent::Closed);
        }
        self.sockets.clear();
        self.pipes.clear();
        self.endpoints.clear();
        self.pending.clear();
    }
}
