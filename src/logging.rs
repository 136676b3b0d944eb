//! Diagnostic tracing setup for the binaries.
//!
//! Progress and warnings meant for the CI log are printed directly; this
//! subscriber only carries `RUST_LOG`-gated diagnostics, always on stderr so
//! the emitter's stdout stays pure JSON.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
