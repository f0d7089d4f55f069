//! # Metrics
//!
//! Prometheus metrics for monitoring sync runs.
//!
//! ## Metrics Exposed
//!
//! - `secret_sync_runs_total` - Total number of sync runs, by outcome
//! - `secret_sync_run_duration_seconds` - Duration of sync runs
//! - `secret_sync_last_run_timestamp_seconds` - Unix time the last run finished
//! - `secret_sync_secrets_created_total` - Secrets created in the destination
//! - `secret_sync_secrets_updated_total` - Secrets whose data or tags were rewritten
//! - `secret_sync_secrets_deleted_total` - Secrets deleted from the destination
//! - `secret_sync_secrets_unchanged_total` - Secrets already in sync
//! - `secret_sync_secret_failures_total` - Per-secret failures, by operation
//! - `secret_sync_backend_operations_total` - Backend calls, by backend and operation
//! - `secret_sync_backend_operation_errors_total` - Failed backend calls, by backend
//!
//! The sync job is one-shot, so metrics are not served over HTTP: the registry
//! is written once at exit in the text exposition format for the node-exporter
//! textfile collector.

use anyhow::{Context, Result};
use prometheus::{
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder,
};
use std::path::Path;
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RUNS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("secret_sync_runs_total", "Total number of sync runs by outcome"),
        &["outcome"],
    )
    .expect("Failed to create RUNS_TOTAL metric - this should never happen")
});

static RUN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "secret_sync_run_duration_seconds",
            "Duration of sync runs in seconds",
        )
        .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

static LAST_RUN_TIMESTAMP: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "secret_sync_last_run_timestamp_seconds",
        "Unix time at which the last sync run finished",
    )
    .expect("Failed to create LAST_RUN_TIMESTAMP metric - this should never happen")
});

static SECRETS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_secrets_created_total",
        "Total number of secrets created in the destination",
    )
    .expect("Failed to create SECRETS_CREATED_TOTAL metric - this should never happen")
});

static SECRETS_UPDATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_secrets_updated_total",
        "Total number of secrets whose data or tags were rewritten",
    )
    .expect("Failed to create SECRETS_UPDATED_TOTAL metric - this should never happen")
});

static SECRETS_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_secrets_deleted_total",
        "Total number of secrets deleted from the destination",
    )
    .expect("Failed to create SECRETS_DELETED_TOTAL metric - this should never happen")
});

static SECRETS_UNCHANGED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_secrets_unchanged_total",
        "Total number of secrets already in sync",
    )
    .expect("Failed to create SECRETS_UNCHANGED_TOTAL metric - this should never happen")
});

static SECRET_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_secret_failures_total",
            "Total number of per-secret failures by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create SECRET_FAILURES_TOTAL metric - this should never happen")
});

static BACKEND_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_backend_operations_total",
            "Total number of backend operations by backend and operation",
        ),
        &["backend", "operation"],
    )
    .expect("Failed to create BACKEND_OPERATIONS_TOTAL metric - this should never happen")
});

static BACKEND_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_backend_operation_errors_total",
            "Total number of failed backend operations by backend",
        ),
        &["backend"],
    )
    .expect("Failed to create BACKEND_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Register every metric with the process registry; safe to call more than once
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    register(Box::new(RUNS_TOTAL.clone()))?;
    register(Box::new(RUN_DURATION.clone()))?;
    register(Box::new(LAST_RUN_TIMESTAMP.clone()))?;
    register(Box::new(SECRETS_CREATED_TOTAL.clone()))?;
    register(Box::new(SECRETS_UPDATED_TOTAL.clone()))?;
    register(Box::new(SECRETS_DELETED_TOTAL.clone()))?;
    register(Box::new(SECRETS_UNCHANGED_TOTAL.clone()))?;
    register(Box::new(SECRET_FAILURES_TOTAL.clone()))?;
    register(Box::new(BACKEND_OPERATIONS_TOTAL.clone()))?;
    register(Box::new(BACKEND_OPERATION_ERRORS_TOTAL.clone()))?;

    Ok(())
}

/// Record the end of a run; `outcome` is `success`, `partial` or `failed`
pub fn record_run(outcome: &str, duration: f64) {
    RUNS_TOTAL.with_label_values(&[outcome]).inc();
    RUN_DURATION.observe(duration);
    LAST_RUN_TIMESTAMP.set(chrono::Utc::now().timestamp());
}

pub fn increment_secrets_created() {
    SECRETS_CREATED_TOTAL.inc();
}

pub fn increment_secrets_updated() {
    SECRETS_UPDATED_TOTAL.inc();
}

pub fn increment_secrets_deleted() {
    SECRETS_DELETED_TOTAL.inc();
}

pub fn increment_secrets_unchanged(count: u64) {
    SECRETS_UNCHANGED_TOTAL.inc_by(count);
}

pub fn increment_secret_failures(operation: &str) {
    SECRET_FAILURES_TOTAL.with_label_values(&[operation]).inc();
}

/// Count one backend call
pub fn record_backend_operation(backend: &str, operation: &str) {
    BACKEND_OPERATIONS_TOTAL
        .with_label_values(&[backend, operation])
        .inc();
}

/// Increment backend operation errors counter
pub fn increment_backend_operation_errors(backend: &str) {
    BACKEND_OPERATION_ERRORS_TOTAL
        .with_label_values(&[backend])
        .inc();
}

/// Render the registry in the Prometheus text exposition format
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics are not valid UTF-8")
}

/// Write the registry to `path` for the textfile collector.
///
/// Goes through a sibling temporary file and a rename so the collector never
/// reads a half-written file.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn write_textfile(path: &Path) -> Result<()> {
    let contents = gather_text()?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write metrics to {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move metrics into {}", path.display()))?;
    Ok(())
}
