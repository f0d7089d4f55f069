//! # Sync Engine
//!
//! One run reconciles one source store into one destination store for a
//! target environment:
//!
//! 1. Provision the destination's namespace if needed.
//! 2. Fetch the source secrets in scope for the environment (see [`scope`]).
//! 3. Narrow them with the optional tag filter.
//! 4. Diff against everything currently in the destination and apply (see [`reconcile`]).
//!
//! Connection, provisioning and listing failures abort the run. Per-secret
//! read, write and delete failures are logged and reported in the [`SyncSummary`].

pub mod plan;
pub mod reconcile;
pub mod scope;
pub mod summary;

pub use plan::{SyncAction, SyncPlan};
pub use reconcile::{apply, reconcile};
pub use scope::{get_scoped_secrets, Scope};
pub use summary::{SyncFailure, SyncSummary};

use crate::error::{StoreError, StoreOperation, SyncError};
use crate::observability::metrics;
use crate::provider::SecretStore;
use crate::secret::{Environment, TagFilter};
use std::time::Instant;
use tracing::info;

/// Parameters of one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub environment: Environment,
    pub filter: TagFilter,
    pub dry_run: bool,
}

impl RunOptions {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            filter: TagFilter::default(),
            dry_run: false,
        }
    }
}

/// Count a backend call and its failure
pub(crate) fn observe<T>(
    system: &str,
    operation: StoreOperation,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    metrics::record_backend_operation(system, operation.as_str());
    if result.is_err() {
        metrics::increment_backend_operation_errors(system);
    }
    result
}

/// Reconcile `source` into `destination` for `options.environment`
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub async fn run(
    source: &dyn SecretStore,
    destination: &dyn SecretStore,
    options: &RunOptions,
) -> Result<SyncSummary, SyncError> {
    let started = Instant::now();
    let result = run_inner(source, destination, options).await;
    let elapsed = started.elapsed().as_secs_f64();

    let outcome = match &result {
        Ok(summary) => summary.outcome(),
        Err(_) => "failed",
    };
    metrics::record_run(outcome, elapsed);
    result
}

async fn run_inner(
    source: &dyn SecretStore,
    destination: &dyn SecretStore,
    options: &RunOptions,
) -> Result<SyncSummary, SyncError> {
    info!(
        source = source.system(),
        destination = destination.system(),
        environment = %options.environment,
        dry_run = options.dry_run,
        "Starting sync"
    );

    if options.dry_run {
        info!(system = destination.system(), "[dry run] Skipping storage provisioning");
    } else {
        observe(
            destination.system(),
            StoreOperation::Provision,
            destination.ensure_storage_ready().await,
        )?;
    }

    let scoped = get_scoped_secrets(source, Scope::Environment(options.environment)).await?;
    let filtered = options.filter.apply(scoped);
    if filtered.applied {
        info!(
            system = source.system(),
            filter = %options.filter,
            remaining = filtered.secrets.len(),
            "Applied tag filter"
        );
    }

    let summary = reconcile(&filtered.secrets, destination, options.dry_run).await?;
    Ok(summary)
}
