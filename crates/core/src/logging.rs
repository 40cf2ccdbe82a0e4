//! Tracing subscriber setup for binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber
///
/// `RUST_LOG` wins when set, otherwise `fallback` (usually
/// [`MarginaliaConfig::log_level`](crate::config::MarginaliaConfig)) is used.
/// Output goes to stderr so stdout stays free for command output. Calling this
/// twice is harmless: the second call keeps the first subscriber.
pub fn init(fallback: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
