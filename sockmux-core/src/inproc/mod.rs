//! In-process messaging engine.
//!
//! The built-in [`Transport`]: every socket of a context lives in one
//! engine, attached peers exchange whole messages through in-memory pipes,
//! and blocking calls park on a condition variable that is signalled on
//! every state change.
//!
//! `tcp://` and `ipc://` endpoints are accepted as names (they require an
//! I/O thread, like a networked engine would) and are matched between
//! sockets of the same context; no OS socket is ever opened.

mod pattern;
mod pipe;
mod state;

use crate::config::ContextConfig;
use crate::endpoint::Endpoint;
use crate::error::{Result, SockmuxError};
use crate::flags::{PollEvents, RecvFlags, SendFlags};
use crate::monitor::{create_monitor, SocketMonitor};
use crate::options::{OptionName, OptionValue, SocketOption, SocketOptions};
use crate::socket_type::SocketType;
use crate::transport::{PollItem, SocketHandle, Transport};
use bytes::Bytes;
use parking_lot::{Condvar, Mutex, MutexGuard};
use pattern::SendStatus;
use state::EngineState;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Transport that keeps every peer inside the current process.
#[derive(Debug)]
pub struct InprocTransport {
    io_threads: usize,
    state: Mutex<EngineState>,
    changed: Condvar,
}

impl InprocTransport {
    /// Open an engine sized by `config`.
    pub fn open(config: ContextConfig) -> Result<Self> {
        if config.max_sockets == 0 {
            return Err(SockmuxError::resource("max_sockets must be at least 1"));
        }
        info!(
            io_threads = config.io_threads,
            max_sockets = config.max_sockets,
            "inproc engine opened"
        );
        Ok(Self {
            io_threads: config.io_threads,
            state: Mutex::new(EngineState::new(config)),
            changed: Condvar::new(),
        })
    }

    fn running(&self) -> Result<MutexGuard<'_, EngineState>> {
        let state = self.state.lock();
        state.ensure_running()?;
        Ok(state)
    }

    /// Wake blocked callers if discarding undeliverable messages made room.
    fn release(&self, state: &mut EngineState) {
        if std::mem::take(&mut state.freed) {
            self.changed.notify_all();
        }
    }

    fn send_frames(&self, handle: SocketHandle, frames: &[Bytes], flags: SendFlags) -> Result<bool> {
        let mut state = self.running()?;
        loop {
            match state.try_send(handle, frames, flags.has_more())? {
                SendStatus::Accepted => {
                    drop(state);
                    self.changed.notify_all();
                    return Ok(true);
                }
                SendStatus::Full if flags.is_nonblocking() => return Ok(false),
                SendStatus::Full => {
                    self.changed.wait(&mut state);
                    state.ensure_running()?;
                }
            }
        }
    }
}

impl Transport for InprocTransport {
    fn io_threads(&self) -> usize {
        self.io_threads
    }

    fn open_socket(
        &self,
        socket_type: SocketType,
        options: SocketOptions,
    ) -> Result<SocketHandle> {
        self.running()?.open(socket_type, options)
    }

    fn close_socket(&self, handle: SocketHandle) -> Result<()> {
        let mut state = self.state.lock();
        if state.terminated {
            return Ok(());
        }
        state.close(handle);
        drop(state);
        self.changed.notify_all();
        Ok(())
    }

    fn set_option(&self, handle: SocketHandle, option: SocketOption) -> Result<()> {
        let mut state = self.running()?;
        let slot = state.slot_mut(handle)?;
        if option.is_subscription() && slot.socket_type != SocketType::Sub {
            debug!(
                socket = %handle,
                socket_type = %slot.socket_type,
                "subscription stored on a socket that does not filter"
            );
        }
        slot.options.apply(option)?;
        drop(state);
        // A larger high water mark or swap budget may unblock senders.
        self.changed.notify_all();
        Ok(())
    }

    fn get_option(&self, handle: SocketHandle, name: OptionName) -> Result<OptionValue> {
        let state = self.running()?;
        if name == OptionName::ReceiveMore {
            return Ok(OptionValue::Bool(state.rcvmore(handle)?));
        }
        state
            .slot(handle)?
            .options
            .get(name)
            .ok_or_else(|| SockmuxError::invalid_option(format!("{name} is not readable")))
    }

    fn bind(&self, handle: SocketHandle, endpoint: &Endpoint) -> Result<()> {
        let mut state = self.running()?;
        state.bind(handle, endpoint)?;
        drop(state);
        self.changed.notify_all();
        Ok(())
    }

    fn connect(&self, handle: SocketHandle, endpoint: &Endpoint) -> Result<()> {
        let mut state = self.running()?;
        state.connect(handle, endpoint)?;
        drop(state);
        self.changed.notify_all();
        Ok(())
    }

    fn send(&self, handle: SocketHandle, frame: Bytes, flags: SendFlags) -> Result<bool> {
        self.send_frames(handle, std::slice::from_ref(&frame), flags)
    }

    fn send_multipart(
        &self,
        handle: SocketHandle,
        frames: Vec<Bytes>,
        flags: SendFlags,
    ) -> Result<bool> {
        if frames.is_empty() {
            return Err(SockmuxError::InvalidMessage(
                "multipart message needs at least one frame".into(),
            ));
        }
        self.send_frames(handle, &frames, flags)
    }

    fn recv(&self, handle: SocketHandle, flags: RecvFlags) -> Result<Option<Bytes>> {
        let mut state = self.running()?;
        loop {
            let received = state.try_recv(handle);
            self.release(&mut state);
            match received? {
                Some(frame) => {
                    drop(state);
                    self.changed.notify_all();
                    return Ok(Some(frame));
                }
                None if flags.is_nonblocking() => return Ok(None),
                None => {
                    self.changed.wait(&mut state);
                    state.ensure_running()?;
                }
            }
        }
    }

    fn wait(&self, items: &mut [PollItem], timeout: Option<Duration>) -> Result<usize> {
        // A deadline too far out to represent is the same as no deadline.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let forever = timeout.is_none() || deadline.is_none();

        let mut state = self.running()?;
        loop {
            let mut ready = 0;
            for item in items.iter_mut() {
                let current = state.readiness(item.handle);
                item.revents = current & (item.events | PollEvents::ERROR);
                if !item.revents.is_empty() {
                    ready += 1;
                }
            }
            self.release(&mut state);
            if ready > 0 {
                return Ok(ready);
            }

            match deadline {
                _ if forever => self.changed.wait(&mut state),
                Some(deadline) if Instant::now() < deadline => {
                    self.changed.wait_until(&mut state, deadline);
                }
                _ => return Ok(0),
            }
            state.ensure_running()?;
        }
    }

    fn monitor(&self, handle: SocketHandle) -> Result<SocketMonitor> {
        let mut state = self.running()?;
        let (tx, rx) = create_monitor();
        state.slot_mut(handle)?.monitor = Some(tx);
        Ok(rx)
    }

    fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.terminated {
            return;
        }
        state.terminate();
        drop(state);
        self.changed.notify_all();
        info!("inproc engine terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::SocketEvent;
    use std::sync::Arc;
    use std::thread;

    fn engine() -> InprocTransport {
        InprocTransport::open(ContextConfig::default()).unwrap()
    }

    fn ep(s: &str) -> Endpoint {
        Endpoint::parse(s).unwrap()
    }

    fn pair(t: &InprocTransport, name: &str) -> (SocketHandle, SocketHandle) {
        let a = t.open_socket(SocketType::Pair, SocketOptions::default()).unwrap();
        let b = t.open_socket(SocketType::Pair, SocketOptions::default()).unwrap();
        t.bind(a, &ep(name)).unwrap();
        t.connect(b, &ep(name)).unwrap();
        (a, b)
    }

    fn recv_all(t: &InprocTransport, h: SocketHandle) -> Vec<Bytes> {
        let mut frames = vec![t.recv(h, RecvFlags::NONE).unwrap().unwrap()];
        while t.get_option(h, OptionName::ReceiveMore).unwrap() == OptionValue::Bool(true) {
            frames.push(t.recv(h, RecvFlags::NONE).unwrap().unwrap());
        }
        frames
    }

    #[test]
    fn test_pair_round_trip() {
        let t = engine();
        let (a, b) = pair(&t, "inproc://pair");

        assert!(t.send(b, Bytes::from_static(b"ping"), SendFlags::NONE).unwrap());
        assert_eq!(t.recv(a, RecvFlags::NONE).unwrap().unwrap(), "ping");
        assert!(t.send(a, Bytes::from_static(b"pong"), SendFlags::NONE).unwrap());
        assert_eq!(t.recv(b, RecvFlags::NONE).unwrap().unwrap(), "pong");
    }

    #[test]
    fn test_nonblocking_recv_on_empty() {
        let t = engine();
        let (a, _b) = pair(&t, "inproc://empty");
        assert_eq!(t.recv(a, RecvFlags::NOBLOCK).unwrap(), None);
    }

    #[test]
    fn test_connect_before_bind() {
        let t = engine();
        let push = t.open_socket(SocketType::Push, SocketOptions::default()).unwrap();
        let pull = t.open_socket(SocketType::Pull, SocketOptions::default()).unwrap();
        let events = t.monitor(push).unwrap();

        t.connect(push, &ep("inproc://late")).unwrap();
        assert!(!t.send(push, Bytes::from_static(b"x"), SendFlags::NOBLOCK).unwrap());

        t.bind(pull, &ep("inproc://late")).unwrap();
        assert!(t.send(push, Bytes::from_static(b"x"), SendFlags::NOBLOCK).unwrap());
        assert_eq!(t.recv(pull, RecvFlags::NONE).unwrap().unwrap(), "x");

        assert_eq!(
            events.try_recv().unwrap(),
            SocketEvent::ConnectDelayed(ep("inproc://late"))
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SocketEvent::Connected(ep("inproc://late"))
        );
    }

    #[test]
    fn test_hwm_and_atomic_multipart() {
        let t = engine();
        let (a, b) = pair(&t, "inproc://hwm");
        t.set_option(b, SocketOption::Hwm(1)).unwrap();

        assert!(t.send(b, Bytes::from_static(b"first"), SendFlags::NOBLOCK).unwrap());

        // Non-final frames are buffered; the final one finds the pipe full.
        assert!(t
            .send(b, Bytes::from_static(b"head"), SendFlags::NOBLOCK | SendFlags::SNDMORE)
            .unwrap());
        assert!(!t.send(b, Bytes::from_static(b"tail"), SendFlags::NOBLOCK).unwrap());

        assert_eq!(t.recv(a, RecvFlags::NONE).unwrap().unwrap(), "first");
        assert!(t.send(b, Bytes::from_static(b"tail"), SendFlags::NOBLOCK).unwrap());
        assert_eq!(recv_all(&t, a), vec!["head", "tail"]);
    }

    #[test]
    fn test_swap_extends_capacity() {
        let t = engine();
        let (_a, b) = pair(&t, "inproc://swap");
        t.set_option(b, SocketOption::Hwm(1)).unwrap();
        t.set_option(b, SocketOption::Swap(8)).unwrap();

        assert!(t.send(b, Bytes::from_static(b"memory"), SendFlags::NOBLOCK).unwrap());
        assert!(t.send(b, Bytes::from_static(b"disk"), SendFlags::NOBLOCK).unwrap());
        assert!(t.send(b, Bytes::from_static(b"more"), SendFlags::NOBLOCK).unwrap());
        assert!(!t.send(b, Bytes::from_static(b"x"), SendFlags::NOBLOCK).unwrap());
    }

    #[test]
    fn test_wait_reports_readiness() {
        let t = engine();
        let (a, b) = pair(&t, "inproc://wait");
        let mut items = [PollItem::new(a, PollEvents::READABLE | PollEvents::WRITABLE)];

        assert_eq!(t.wait(&mut items, Some(Duration::ZERO)).unwrap(), 1);
        assert_eq!(items[0].revents, PollEvents::WRITABLE);

        items[0].events = PollEvents::READABLE;
        assert_eq!(t.wait(&mut items, Some(Duration::from_millis(10))).unwrap(), 0);
        assert!(items[0].revents.is_empty());

        t.send(b, Bytes::from_static(b"hi"), SendFlags::NONE).unwrap();
        assert_eq!(t.wait(&mut items, None).unwrap(), 1);
        assert_eq!(items[0].revents, PollEvents::READABLE);
    }

    #[test]
    fn test_wait_flags_closed_handle() {
        let t = engine();
        let (a, _b) = pair(&t, "inproc://stale");
        t.close_socket(a).unwrap();

        let mut items = [PollItem::new(a, PollEvents::READABLE)];
        assert_eq!(t.wait(&mut items, Some(Duration::ZERO)).unwrap(), 1);
        assert_eq!(items[0].revents, PollEvents::ERROR);
    }

    #[test]
    fn test_blocking_recv_wakes_on_send() {
        let t = Arc::new(engine());
        let (a, b) = pair(&t, "inproc://wake");

        let receiver = {
            let t = Arc::clone(&t);
            thread::spawn(move || t.recv(a, RecvFlags::NONE).unwrap())
        };
        thread::sleep(Duration::from_millis(20));
        t.send(b, Bytes::from_static(b"late"), SendFlags::NONE).unwrap();

        assert_eq!(receiver.join().unwrap().unwrap(), "late");
    }

    #[test]
    fn test_shutdown_unblocks_waiters() {
        let t = Arc::new(engine());
        let (a, _b) = pair(&t, "inproc://shutdown");

        let receiver = {
            let t = Arc::clone(&t);
            thread::spawn(move || t.recv(a, RecvFlags::NONE))
        };
        thread::sleep(Duration::from_millis(20));
        t.shutdown();

        assert!(receiver.join().unwrap().unwrap_err().is_lifecycle());
        assert!(t
            .open_socket(SocketType::Pair, SocketOptions::default())
            .unwrap_err()
            .is_lifecycle());
        assert!(t.close_socket(a).is_ok());
    }

    #[test]
    fn test_network_endpoint_needs_io_thread() {
        let t = InprocTransport::open(ContextConfig::new().with_io_threads(0)).unwrap();
        let s = t.open_socket(SocketType::Pub, SocketOptions::default()).unwrap();

        let err = t.bind(s, &ep("tcp://127.0.0.1:5555")).unwrap_err();
        assert!(matches!(err, SockmuxError::Resource(_)));
        assert!(t.bind(s, &ep("inproc://fine")).is_ok());
    }

    #[test]
    fn test_socket_limit() {
        let t = InprocTransport::open(ContextConfig::new().with_max_sockets(1)).unwrap();
        let first = t.open_socket(SocketType::Pair, SocketOptions::default()).unwrap();
        assert!(t.open_socket(SocketType::Pair, SocketOptions::default()).is_err());

        t.close_socket(first).unwrap();
        assert!(t.open_socket(SocketType::Pair, SocketOptions::default()).is_ok());
        assert!(InprocTransport::open(ContextConfig::new().with_max_sockets(0)).is_err());
    }

    #[test]
    fn test_duplicate_bind() {
        let t = engine();
        let a = t.open_socket(SocketType::Pull, SocketOptions::default()).unwrap();
        let b = t.open_socket(SocketType::Pull, SocketOptions::default()).unwrap();
        t.bind(a, &ep("inproc://taken")).unwrap();

        let err = t.bind(b, &ep("inproc://taken")).unwrap_err();
        assert!(matches!(err, SockmuxError::Bind { .. }));

        t.close_socket(a).unwrap();
        assert!(t.bind(b, &ep("inproc://taken")).is_ok());
    }

    #[test]
    fn test_wildcard_bind_reached_by_host() {
        let t = engine();
        let pull = t.open_socket(SocketType::Pull, SocketOptions::default()).unwrap();
        let early = t.open_socket(SocketType::Push, SocketOptions::default()).unwrap();
        let late = t.open_socket(SocketType::Push, SocketOptions::default()).unwrap();

        // One connecter parked before the bind, one attaching after it.
        t.connect(early, &ep("tcp://localhost:7100")).unwrap();
        t.bind(pull, &ep("tcp://*:7100")).unwrap();
        t.connect(late, &ep("tcp://127.0.0.1:7100")).unwrap();

        assert!(t.send(early, Bytes::from_static(b"early"), SendFlags::NOBLOCK).unwrap());
        assert!(t.send(late, Bytes::from_static(b"late"), SendFlags::NOBLOCK).unwrap());
        let mut got = vec![
            t.recv(pull, RecvFlags::NOBLOCK).unwrap().unwrap(),
            t.recv(pull, RecvFlags::NOBLOCK).unwrap().unwrap(),
        ];
        got.sort();
        assert_eq!(got, vec!["early", "late"]);
    }

    #[test]
    fn test_wildcard_bind_collides_with_host_bind() {
        let t = engine();
        let a = t.open_socket(SocketType::Pull, SocketOptions::default()).unwrap();
        let b = t.open_socket(SocketType::Pull, SocketOptions::default()).unwrap();
        t.bind(a, &ep("tcp://127.0.0.1:7200")).unwrap();

        let err = t.bind(b, &ep("tcp://*:7200")).unwrap_err();
        assert!(matches!(err, SockmuxError::Bind { .. }));
        assert!(t.bind(b, &ep("tcp://127.0.0.1:7201")).is_ok());
    }

    #[test]
    fn test_incompatible_peers_refused() {
        let t = engine();
        let publisher = t.open_socket(SocketType::Pub, SocketOptions::default()).unwrap();
        let pull = t.open_socket(SocketType::Pull, SocketOptions::default()).unwrap();
        let events = t.monitor(pull).unwrap();

        t.bind(publisher, &ep("inproc://mismatch")).unwrap();
        t.connect(pull, &ep("inproc://mismatch")).unwrap();

        assert!(matches!(
            events.try_recv().unwrap(),
            SocketEvent::ConnectFailed { .. }
        ));
        let mut items = [PollItem::new(publisher, PollEvents::WRITABLE)];
        // PUB stays writable with no subscribers; the message is dropped.
        assert_eq!(t.wait(&mut items, Some(Duration::ZERO)).unwrap(), 1);
        assert!(t.send(publisher, Bytes::from_static(b"void"), SendFlags::NOBLOCK).unwrap());
    }

    #[test]
    fn test_multipart_rejects_empty() {
        let t = engine();
        let (a, _b) = pair(&t, "inproc://nothing");
        assert!(matches!(
            t.send_multipart(a, Vec::new(), SendFlags::NONE),
            Err(SockmuxError::InvalidMessage(_))
        ));
    }
}
