//! Example: request/reply with a worker thread and socket monitoring.
//!
//! Run with:
//! ```bash
//! RUST_LOG=sockmux_core=debug cargo run --example req_rep
//! ```

use sockmux::{Context, RecvFlags, SendFlags, SocketEvent, SocketType};
use std::thread;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sockmux::dev_tracing::init_tracing();

    let ctx = Context::new(1)?;
    let server = ctx.socket(SocketType::Rep)?;
    let monitor = server.monitor()?;
    server.bind("tcp://127.0.0.1:5555")?;

    let worker = thread::spawn(move || -> sockmux::Result<()> {
        for _ in 0..3 {
            let Some(request) = server.recv(RecvFlags::NONE)? else {
                break;
            };
            let reply = format!("echo: {}", String::from_utf8_lossy(&request));
            server.send(reply, SendFlags::NONE)?;
        }
        Ok(())
    });

    let client = ctx.socket(SocketType::Req)?;
    client.connect("tcp://127.0.0.1:5555")?;
    for word in ["alpha", "beta", "gamma"] {
        client.send(word, SendFlags::NONE)?;
        if let Some(reply) = client.recv(RecvFlags::NONE)? {
            println!("{word} -> {}", String::from_utf8_lossy(&reply));
        }
    }

    worker.join().map_err(|_| "worker panicked")??;

    for event in monitor.try_iter() {
        match event {
            SocketEvent::Bound(ep) => println!("✓ Bound to {ep}"),
            SocketEvent::Accepted(ep) => println!("✓ Accepted peer on {ep}"),
            SocketEvent::Closed => println!("✗ Closed"),
            other => println!("• {other}"),
        }
    }
    Ok(())
}
