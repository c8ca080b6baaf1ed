//! Integration tests for the socket option table

use bytes::Bytes;
use sockmux_core::options::{OptionName, OptionValue, SocketOption, SocketOptions};
use std::time::Duration;

#[test]
fn test_multicast_tuning_options() {
    let opts = SocketOptions::new()
        .with_rate(200)
        .with_recovery_ivl(Duration::from_secs(20))
        .with_mcast_loop(false)
        .with_sndbuf(65536)
        .with_rcvbuf(65536);

    assert_eq!(opts.rate, 200);
    assert_eq!(opts.recovery_ivl, Duration::from_secs(20));
    assert!(!opts.mcast_loop);
    assert_eq!(opts.sndbuf, 65536);
    assert_eq!(opts.rcvbuf, 65536);
}

#[test]
fn test_default_values() {
    let opts = SocketOptions::default();

    assert_eq!(opts.hwm, 0); // Unlimited
    assert_eq!(opts.swap, 0);
    assert_eq!(opts.affinity, 0);
    assert!(opts.identity.is_empty());
    assert!(opts.subscriptions.is_empty());
    assert_eq!(opts.rate, 100); // 100 kbps
    assert_eq!(opts.recovery_ivl, Duration::from_secs(10));
    assert!(opts.mcast_loop);
    assert_eq!(opts.sndbuf, 0); // OS default
    assert_eq!(opts.rcvbuf, 0); // OS default
}

#[test]
fn test_tagged_round_trip() {
    let mut opts = SocketOptions::new();
    opts.apply(SocketOption::Hwm(10)).unwrap();
    opts.apply(SocketOption::Swap(1 << 20)).unwrap();
    opts.apply(SocketOption::Affinity(0b11)).unwrap();
    opts.apply(SocketOption::Identity(Bytes::from_static(b"node-7")))
        .unwrap();

    assert_eq!(opts.get(OptionName::Hwm), Some(OptionValue::U64(10)));
    assert_eq!(opts.get(OptionName::Swap), Some(OptionValue::U64(1 << 20)));
    assert_eq!(opts.get(OptionName::Affinity), Some(OptionValue::U64(3)));
    assert_eq!(
        opts.get(OptionName::Identity),
        Some(OptionValue::Bytes(Bytes::from_static(b"node-7")))
    );
    assert_eq!(opts.get(OptionName::ReceiveMore), None);
}

#[test]
fn test_subscriptions_through_options() {
    let mut opts = SocketOptions::new().with_subscription("A");
    opts.apply(SocketOption::Subscribe(Bytes::from_static(b"AB")))
        .unwrap();

    assert!(opts.subscriptions.matches(b"ABC"));
    assert!(!opts.subscriptions.matches(b"B"));

    opts.apply(SocketOption::Unsubscribe(Bytes::from_static(b"A")))
        .unwrap();
    assert!(!opts.subscriptions.matches(b"A"));
    assert!(opts
        .apply(SocketOption::Unsubscribe(Bytes::from_static(b"A")))
        .is_err());
    assert_eq!(opts.subscriptions.len(), 1);
}

#[test]
fn test_invalid_identity_rejected() {
    let mut opts = SocketOptions::new().with_identity("keep");
    assert!(opts
        .apply(SocketOption::Identity(Bytes::from(vec![0u8, 1, 2])))
        .is_err());
    assert!(opts
        .apply(SocketOption::Identity(Bytes::from(vec![b'x'; 256])))
        .is_err());
    assert_eq!(opts.identity, Bytes::from_static(b"keep"));
}
