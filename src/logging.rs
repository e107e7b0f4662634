//! Logging setup.
//!
//! Logs go to **stderr**; stdout carries only the handshake line. Filtering
//! follows `RUST_LOG` and defaults to `info`.
//!
//! ```bash
//! # BAM calls and session handling
//! RUST_LOG=bluecat_provider=debug ./bluecat-provider
//!
//! # Everything, including tonic and reqwest
//! RUST_LOG=debug ./bluecat-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, registry::Registry, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn stderr_layer() -> impl Layer<Registry> + Send + Sync {
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Install the global subscriber.
///
/// Does nothing if a subscriber is already installed; use
/// [`try_init_logging`] to find out.
pub fn init_logging() {
    try_init_logging();
}

/// Install the global subscriber, returning `false` if one was already set.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(stderr_layer().with_filter(filter()))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        assert!(EnvFilter::try_new("bluecat_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,bluecat_provider::bam=trace").is_ok());
    }

    #[test]
    fn test_second_init_reports_false() {
        try_init_logging();
        assert!(!try_init_logging());
    }
}
