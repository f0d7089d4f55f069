//! # Observability
//!
//! Observability modules for logging and metrics.
//!
//! - `logging`: tracing subscriber setup
//! - `metrics`: Prometheus metrics collection

pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use logging::init_logging;
pub use metrics::{register_metrics, write_textfile};
