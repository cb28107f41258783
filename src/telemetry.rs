//! Structured logging setup.
//!
//! `tracing` events everywhere, rendered by `tracing-subscriber`'s fmt
//! layer and filtered with `RUST_LOG`-style directives.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber. An unparsable `filter` falls back to
/// `info` rather than silencing the process. A second call is a no-op.
pub fn init(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_does_not_panic() {
        init("roster=debug");
        init("not a [valid filter");
    }
}
