//! Tracing setup for the binary.

use tracing_subscriber::EnvFilter;

/// Level used when neither `RUST_LOG` nor the configured level parse.
const FALLBACK_LEVEL: &str = "info";

/// Builds the log filter.
///
/// `RUST_LOG` wins when it is set and valid, so per-module directives such as
/// `topicrelay::client=debug` work without touching the config file.
/// Otherwise `level` (normally `log.level` from the settings) is used.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| match level.trim() {
            "" => Ok(EnvFilter::new(FALLBACK_LEVEL)),
            level => EnvFilter::try_new(level),
        })
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(false)
        .try_init();
}
