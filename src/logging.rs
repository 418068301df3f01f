//! Logging setup for hosts embedding the stream provider.
//!
//! Logs go to **stderr** so stdout stays free for the host protocol. Filtering
//! follows `RUST_LOG`, e.g. `RUST_LOG=thousandeyes_stream_provider=debug` to
//! see every request URL and response status.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crate-level filter directive enabling request/response logging.
pub const DEBUG_DIRECTIVE: &str = "thousandeyes_stream_provider=debug";

/// Initialize logging at `info` unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with `default_level` used when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    if !install(default_level) {
        panic!("a global tracing subscriber is already set");
    }
}

/// Like [`init_logging`], but returns `false` instead of panicking when a
/// subscriber is already installed. Handy in tests.
pub fn try_init_logging() -> bool {
    install("info")
}

fn install(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}
