//! Development helper: initialize a tracing subscriber when `RUST_LOG` is set.

/// Install a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`.
///
/// Benches and tests can call `sockmux::dev_tracing::init_tracing()` to see
/// engine events such as `RUST_LOG=sockmux_core=trace`. This is a no-op when
/// `RUST_LOG` is not set or when a global subscriber is already installed.
pub fn init_tracing() {
    use std::env;

    if env::var("RUST_LOG").is_ok() {
        // Best-effort: tests call this repeatedly from many threads.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}
