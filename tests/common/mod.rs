//! Common test utilities for sync integration tests
//!
//! Builders for secret payloads and a one-time tracing setup so that failing
//! tests show the engine's log output.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use secret_sync::secret::{SecretMap, Value, ENVIRONMENT_TAG};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber, once per test binary
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "secret_sync=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Map of string values
pub fn strings(pairs: &[(&str, &str)]) -> SecretMap {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), Value::from(*value)))
        .collect()
}

/// Map of integer values
pub fn ints(pairs: &[(&str, i64)]) -> SecretMap {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), Value::from(*value)))
        .collect()
}

/// Tags holding only an `Environment` tag
pub fn env_tag(environment: &str) -> SecretMap {
    strings(&[(ENVIRONMENT_TAG, environment)])
}
