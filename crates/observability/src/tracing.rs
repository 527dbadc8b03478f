//! Tracing subscriber initialization.
//!
//! Events are written to stdout as one JSON object per line. The level filter
//! comes from `RUST_LOG` when set, e.g. `RUST_LOG=catalog_infra=debug,info`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is absent or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Build the level filter: `RUST_LOG` if usable, otherwise `fallback`.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize tracing/logging for the process.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(fallback: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(fallback))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_current_span(true)
        .with_target(false)
        .try_init()
        .is_ok()
}
