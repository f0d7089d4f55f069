//! # Logging
//!
//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence when set; otherwise the configured level applies
//! to this crate only, keeping SDK and HTTP client noise out of the job output.

use crate::config::{LogConfig, LogFormat};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Default filter directive for `level`
#[must_use]
pub fn default_directive(level: Level) -> String {
    format!("secret_sync={}", level.to_string().to_lowercase())
}

/// Install the global tracing subscriber.
///
/// Returns an error if a subscriber is already installed, which callers may
/// ignore (tests install their own).
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn init_logging(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
    }
}
