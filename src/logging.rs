//! Logging setup for the provider binary.
//!
//! All logs go to **stderr**: stdout carries the handshake line that Hemmer
//! reads to find the provider's gRPC address.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `debug`, `hemmer_provider_whisparr=debug`)
//!
//! ```bash
//! # Log every Whisparr API request
//! RUST_LOG=hemmer_provider_whisparr::client=debug hemmer-provider-whisparr
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directives appended to the default level so HTTP internals stay quiet
/// unless `RUST_LOG` asks for them.
const QUIET_DEPENDENCIES: &str = "hyper=warn,h2=warn,tower=warn,reqwest=warn";

fn default_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}", default_level, QUIET_DEPENDENCIES)))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize the default logging subscriber at `info` level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level, used when `RUST_LOG` is
/// not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(default_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if already initialized.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(default_filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so only the
    // filter construction is exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_whisparr=debug").is_ok());
        assert!(EnvFilter::try_new(format!("debug,{}", QUIET_DEPENDENCIES)).is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
