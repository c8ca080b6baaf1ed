//! End-to-end flows through Context, Socket and Poller.

use sockmux::{Context, PollEvents, RecvFlags, SendFlags, SocketType};
use std::thread;
use std::time::Duration;

#[test]
fn test_push_pull_connect_before_bind() -> sockmux::Result<()> {
    sockmux::dev_tracing::init_tracing();
    let ctx = Context::new(1)?;
    let s1 = ctx.socket(SocketType::Push)?;
    let s2 = ctx.socket(SocketType::Pull)?;

    s1.connect("tcp://127.0.0.1:5555")?;
    s2.bind("tcp://127.0.0.1:5555")?;

    assert!(s1.send(vec![1u8, 2, 3], SendFlags::NONE)?);
    let frame = s2.recv(RecvFlags::NONE)?.expect("blocking recv returns a frame");
    assert_eq!(&frame[..], &[1, 2, 3]);
    assert!(!s2.has_receive_more()?);
    Ok(())
}

#[test]
fn test_wildcard_bind_reached_by_address_and_name() -> sockmux::Result<()> {
    let ctx = Context::new(1)?;
    let pull = ctx.socket(SocketType::Pull)?;
    let by_addr = ctx.socket(SocketType::Push)?;
    let by_name = ctx.socket(SocketType::Push)?;

    pull.bind("tcp://*:5556")?;
    by_addr.connect("tcp://127.0.0.1:5556")?;
    by_name.connect("tcp://localhost:5556")?;

    assert!(by_addr.send(&b"addr"[..], SendFlags::NOBLOCK)?);
    assert_eq!(pull.recv(RecvFlags::NOBLOCK)?.unwrap(), "addr");
    assert!(by_name.send(&b"name"[..], SendFlags::NOBLOCK)?);
    assert_eq!(pull.recv(RecvFlags::NOBLOCK)?.unwrap(), "name");
    Ok(())
}

#[test]
fn test_poll_reports_incoming_data()-> sockmux::Result<()> {
    let ctx = Context::new(1)?;
    let s1 = ctx.socket(SocketType::Push)?;
    let s2 = ctx.socket(SocketType::Pull)?;
    let idle = ctx.socket(SocketType::Sub)?;
    s2.bind("inproc://scenario")?;
    s1.connect("inproc://scenario")?;

    let mut poller = ctx.poller(2)?;
    let i2 = poller.register(&s2).unwrap();
    let i3 = poller.register(&idle).unwrap();
    assert_eq!(poller.events(i2), Some(PollEvents::ALL));

    assert_eq!(poller.poll_timeout(0)?, 0);
    assert!(!poller.is_readable(i2));

    s1.send(&b"payload"[..], SendFlags::NONE)?;
    assert!(poller.poll()? >= 1);
    assert!(poller.is_readable(i2));
    assert!(!poller.is_readable(i3));
    assert!(!poller.is_writable(i2));
    Ok(())
}

#[test]
fn test_poll_loop_drives_echo() -> sockmux::Result<()> {
    let ctx = Context::new(1)?;
    let server = ctx.socket(SocketType::Rep)?;
    server.bind("inproc://echo")?;

    let client_ctx = ctx.clone();
    let client = thread::spawn(move || -> sockmux::Result<Vec<String>> {
        let req = client_ctx.socket(SocketType::Req)?;
        req.connect("inproc://echo")?;
        let mut replies = Vec::new();
        for i in 0..3 {
            req.send(format!("ping {i}"), SendFlags::NONE)?;
            let reply = req.recv(RecvFlags::NONE)?.unwrap_or_default();
            replies.push(String::from_utf8_lossy(&reply).into_owned());
        }
        Ok(replies)
    });

    let mut poller = ctx.poller(1)?;
    let idx = poller.register_with(&server, PollEvents::READABLE).unwrap();
    poller.set_timeout(-1);

    for _ in 0..3 {
        assert_eq!(poller.poll()?, 1);
        assert!(poller.is_readable(idx));
        let request = server.recv(RecvFlags::NOBLOCK)?.unwrap();
        server.send(request, SendFlags::NONE)?;
    }

    let replies = client.join().unwrap()?;
    assert_eq!(replies, vec!["ping 0", "ping 1", "ping 2"]);
    Ok(())
}

#[test]
fn test_blocked_poll_wakes_on_send() -> sockmux::Result<()> {
    let ctx = Context::new(1)?;
    let pull = ctx.socket(SocketType::Pull)?;
    let push = ctx.socket(SocketType::Push)?;
    pull.bind("inproc://wake")?;
    push.connect("inproc://wake")?;

    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        push.send(&b"late"[..], SendFlags::NONE)
    });

    let mut poller = ctx.poller(1)?;
    let idx = poller.register(&pull).unwrap();
    assert_eq!(poller.poll_timeout(5_000)?, 1);
    assert!(poller.is_readable(idx));
    assert!(sender.join().unwrap()?);
    Ok(())
}
