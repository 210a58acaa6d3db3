//! Structured logging for provider binaries
//!
//! stdout carries the plugin handshake, so every log line goes to stderr,
//! where Terraform collects it into its own log at `TF_LOG` levels.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a stderr subscriber filtered by `RUST_LOG` (default `info`).
/// Does nothing if a global subscriber is already set.
pub fn init_logging() {
    init_logging_with_default("info");
}

pub fn init_logging_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(false),
        )
        .try_init();
}
