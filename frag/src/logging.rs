//! Diagnostic tracing for the library and CLI.
//!
//! Library code only emits events (`debug!` for cache and parse activity,
//! `warn!` for cascade cutoffs and templates rendered despite diagnostics).
//! Nothing is printed unless a subscriber is installed, which the `frag`
//! binary does through [`init`].

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable: only this crate's
/// warnings.
pub const DEFAULT_DIRECTIVE: &str = "frag=warn";

/// Build the event filter from a `RUST_LOG`-style directive string.
pub fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install a compact stderr subscriber filtered by `RUST_LOG`.
///
/// # Example
/// ```bash
/// RUST_LOG=frag=debug frag render page.html --data page.json
/// ```
pub fn init() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(filter_from(directives.as_deref()))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
