//! Multi-part framing and high water mark backpressure.

use sockmux::{Context, Message, RecvFlags, SendFlags, Socket, SocketType};

fn connected_pair(ctx: &Context, name: &str) -> sockmux::Result<(Socket, Socket)> {
    let a = ctx.socket(SocketType::Pair)?;
    let b = ctx.socket(SocketType::Pair)?;
    a.bind(name)?;
    b.connect(name)?;
    Ok((a, b))
}

#[test]
fn test_receive_more_tracks_every_part() -> sockmux::Result<()> {
    let ctx = Context::new(0)?;
    let (a, b) = connected_pair(&ctx, "inproc://frames")?;

    for n in 1..=5usize {
        for i in 0..n {
            let flags = if i + 1 < n {
                SendFlags::SNDMORE
            } else {
                SendFlags::NONE
            };
            assert!(b.send(format!("{n}:{i}"), flags)?);
        }

        for i in 0..n {
            let frame = a.recv(RecvFlags::NONE)?.unwrap();
            assert_eq!(frame, format!("{n}:{i}").as_bytes());
            assert_eq!(a.has_receive_more()?, i + 1 < n, "part {i} of {n}");
        }
    }
    Ok(())
}

#[test]
fn test_partial_message_is_not_delivered() -> sockmux::Result<()> {
    let ctx = Context::new(0)?;
    let (a, b) = connected_pair(&ctx, "inproc://partial")?;

    b.send(&b"first"[..], SendFlags::SNDMORE)?;
    b.send(&b"second"[..], SendFlags::SNDMORE)?;
    assert_eq!(a.recv(RecvFlags::NOBLOCK)?, None);

    b.send(&b"last"[..], SendFlags::NONE)?;
    let msg = a.recv_multipart(RecvFlags::NOBLOCK)?.unwrap();
    assert_eq!(msg.into_frames(), vec!["first", "second", "last"]);
    Ok(())
}

#[test]
fn test_multipart_round_trip() -> sockmux::Result<()> {
    let ctx = Context::new(0)?;
    let (a, b) = connected_pair(&ctx, "inproc://multipart")?;

    let msg = Message::new().push_str("topic").push_empty().push_str("body");
    assert!(b.send_multipart(msg.clone(), SendFlags::NONE)?);
    assert_eq!(a.recv_multipart(RecvFlags::NONE)?, Some(msg));
    assert!(!a.has_receive_more()?);
    Ok(())
}

#[test]
fn test_noblock_backpressure_at_hwm() -> sockmux::Result<()> {
    let ctx = Context::new(0)?;
    let push = ctx.socket(SocketType::Push)?;
    let pull = ctx.socket(SocketType::Pull)?;
    push.set_hwm(2)?;
    pull.bind("inproc://hwm")?;
    push.connect("inproc://hwm")?;

    assert!(push.send(&b"m1"[..], SendFlags::NOBLOCK)?);
    assert!(push.send(&b"m2"[..], SendFlags::NOBLOCK)?);
    assert!(!push.send(&b"m3"[..], SendFlags::NOBLOCK)?);
    assert!(!push.send(&b"m3"[..], SendFlags::NOBLOCK)?);

    assert_eq!(pull.recv(RecvFlags::NONE)?.unwrap(), "m1");
    assert!(push.send(&b"m4"[..], SendFlags::NOBLOCK)?);

    assert_eq!(pull.recv(RecvFlags::NONE)?.unwrap(), "m2");
    assert_eq!(pull.recv(RecvFlags::NONE)?.unwrap(), "m4");
    assert_eq!(pull.recv(RecvFlags::NOBLOCK)?, None);
    Ok(())
}

#[test]
fn test_noblock_multipart_is_all_or_nothing() -> sockmux::Result<()> {
    let ctx = Context::new(0)?;
    let (a, b) = connected_pair(&ctx, "inproc://atomic")?;
    b.set_hwm(1)?;

    assert!(b.send(&b"filler"[..], SendFlags::NOBLOCK)?);
    let msg = Message::new().push_str("one").push_str("two");
    assert!(!b.send_multipart(msg.clone(), SendFlags::NOBLOCK)?);

    assert_eq!(a.recv(RecvFlags::NONE)?.unwrap(), "filler");
    assert!(!a.has_receive_more()?);
    assert_eq!(a.recv(RecvFlags::NOBLOCK)?, None);

    assert!(b.send_multipart(msg.clone(), SendFlags::NOBLOCK)?);
    assert_eq!(a.recv_multipart(RecvFlags::NONE)?, Some(msg));
    Ok(())
}

#[test]
fn test_swap_budget_absorbs_overflow() -> sockmux::Result<()> {
    let ctx = Context::new(0)?;
    let (_a, b) = connected_pair(&ctx, "inproc://swap")?;
    b.set_hwm(1)?;
    b.set_swap(10)?;

    assert!(b.send(vec![0u8; 4], SendFlags::NOBLOCK)?);
    assert!(b.send(vec![0u8; 5], SendFlags::NOBLOCK)?);
    assert!(b.send(vec![0u8; 5], SendFlags::NOBLOCK)?);
    assert!(!b.send(vec![0u8; 1], SendFlags::NOBLOCK)?);
    Ok(())
}

#[test]
fn test_empty_frames_cannot_outgrow_swap() -> sockmux::Result<()> {
    let ctx = Context::new(0)?;
    let push = ctx.socket(SocketType::Push)?;
    let pull = ctx.socket(SocketType::Pull)?;
    push.set_hwm(1)?;
    push.set_swap(8)?;
    pull.bind("inproc://empty-swap")?;
    push.connect("inproc://empty-swap")?;

    let accepted = (0..100)
        .take_while(|_| push.send(Vec::<u8>::new(), SendFlags::NOBLOCK).unwrap_or(false))
        .count();
    assert_eq!(accepted, 9);

    for _ in 0..accepted {
        assert_eq!(pull.recv(RecvFlags::NOBLOCK)?.unwrap(), "");
    }
    assert_eq!(pull.recv(RecvFlags::NOBLOCK)?, None);
    Ok(())
}

#[test]
fn test_blocking_send_waits_for_room() -> sockmux::Result<()> {
    let ctx = Context::new(0)?;
    let (a, b) = connected_pair(&ctx, "inproc://blocking")?;
    b.set_hwm(1)?;
    b.send(&b"queued"[..], SendFlags::NONE)?;

    let sender = std::thread::spawn(move || b.send(&b"waiting"[..], SendFlags::NONE));
    std::thread::sleep(std::time::Duration::from_millis(20));

    assert_eq!(a.recv(RecvFlags::NONE)?.unwrap(), "queued");
    assert!(sender.join().unwrap()?);
    assert_eq!(a.recv(RecvFlags::NONE)?.unwrap(), "waiting");
    Ok(())
}

#[test]
fn test_empty_multipart_is_rejected() -> sockmux::Result<()> {
    let ctx = Context::new(0)?;
    let (_a, b) = connected_pair(&ctx, "inproc://empty")?;
    let err = b.send_multipart(Message::new(), SendFlags::NONE).unwrap_err();
    assert!(matches!(err, sockmux::SockmuxError::InvalidMessage(_)));
    Ok(())
}
