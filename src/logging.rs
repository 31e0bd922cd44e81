//! Logging setup for the plugin process.
//!
//! Stdout carries the handshake line and nothing else, so every log line
//! goes to **stderr**. `RUST_LOG` overrides the default level, e.g.
//! `RUST_LOG=hemmer_provider_fivetran=debug` to see each API request.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the stderr subscriber.
///
/// Returns `false` when a global subscriber was already installed, which
/// happens when tests drive several providers in one process.
pub fn try_init_logging(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter(default_level))
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

/// Install the stderr subscriber at [`DEFAULT_LOG_LEVEL`].
pub fn init_logging() {
    if !try_init_logging(DEFAULT_LOG_LEVEL) {
        tracing::debug!("Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_LEVEL).is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_fivetran=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_fivetran::client=debug").is_ok());
    }

    #[test]
    fn test_second_init_is_harmless() {
        try_init_logging("warn");
        assert!(!try_init_logging("warn"));
    }
}
