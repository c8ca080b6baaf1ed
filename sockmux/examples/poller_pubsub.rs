//! Example: one poller multiplexing a subscriber and a work queue.
//!
//! This example shows how to:
//! - Filter a PUB/SUB stream by topic prefix
//! - Register several sockets in a fixed-capacity poller
//! - Drain multi-part messages as they become readable
//!
//! Run with:
//! ```bash
//! cargo run --example poller_pubsub
//! ```

use sockmux::{Context, Message, RecvFlags, SendFlags, SocketType};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Poller Example ===\n");

    let ctx = Context::new(1)?;

    let weather = ctx.socket(SocketType::Sub)?;
    weather.subscribe("weather.")?;
    weather.connect("inproc://feed")?;

    let jobs = ctx.socket(SocketType::Pull)?;
    jobs.bind("inproc://jobs")?;

    let producer_ctx = ctx.clone();
    let producer = thread::spawn(move || -> sockmux::Result<()> {
        let publisher = producer_ctx.socket(SocketType::Pub)?;
        publisher.bind("inproc://feed")?;
        let push = producer_ctx.socket(SocketType::Push)?;
        push.connect("inproc://jobs")?;

        for i in 0..3 {
            publisher.send_multipart(
                Message::new()
                    .push_str("weather.lisbon")
                    .push(format!("{}C", 18 + i)),
                SendFlags::NONE,
            )?;
            publisher.send(&b"sports.score"[..], SendFlags::NONE)?;
            push.send(format!("job {i}"), SendFlags::NONE)?;
            thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    });

    let mut poller = ctx.poller(2)?;
    let w = poller.register(&weather).ok_or("poller full")?;
    let j = poller.register(&jobs).ok_or("poller full")?;
    poller.set_timeout(200);

    let mut received = 0;
    while received < 6 {
        if poller.poll()? == 0 {
            println!("… idle");
            continue;
        }
        if poller.is_readable(w) {
            while let Some(msg) = weather.recv_multipart(RecvFlags::NOBLOCK)? {
                let frames: Vec<String> = msg
                    .into_iter()
                    .map(|f| String::from_utf8_lossy(&f).into_owned())
                    .collect();
                println!("📡 {}", frames.join(" = "));
                received += 1;
            }
        }
        if poller.is_readable(j) {
            while let Some(job) = jobs.recv(RecvFlags::NOBLOCK)? {
                println!("🔧 {}", String::from_utf8_lossy(&job));
                received += 1;
            }
        }
    }

    producer.join().map_err(|_| "producer panicked")??;
    ctx.terminate();
    println!("\n✓ Done");
    Ok(())
}
