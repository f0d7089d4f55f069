//! # Reconciliation
//!
//! Brings a destination store in line with a desired list of secrets.
//!
//! Every write and delete is isolated: a failure is recorded in the
//! [`SyncSummary`] and the remaining actions still run. Nothing already
//! written is rolled back; the next run converges whatever was left behind.

use super::plan::{SyncAction, SyncPlan};
use super::scope::{get_scoped_secrets, Scope};
use super::observe;
use super::summary::SyncSummary;
use crate::error::{StoreError, StoreOperation};
use crate::observability::metrics;
use crate::provider::SecretStore;
use crate::secret::Secret;
use tracing::{debug, info};

/// Fetch the destination's current secrets, diff, and apply.
///
/// Only a failure to list the destination is returned as an error.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub async fn reconcile(
    desired: &[Secret],
    destination: &dyn SecretStore,
    dry_run: bool,
) -> Result<SyncSummary, StoreError> {
    let current = get_scoped_secrets(destination, Scope::All).await?;
    let plan = SyncPlan::compute(desired, &current);
    info!(
        system = destination.system(),
        desired = desired.len(),
        current = current.len(),
        create = plan.creates(),
        update = plan.updates(),
        delete = plan.deletes(),
        unchanged = plan.unchanged(),
        "Computed sync plan"
    );
    Ok(apply(&plan, destination, dry_run).await)
}

/// Execute `plan` against `destination`.
///
/// With `dry_run`, each action is logged and counted but not executed.
pub async fn apply(plan: &SyncPlan, destination: &dyn SecretStore, dry_run: bool) -> SyncSummary {
    let system = destination.system();
    let mut summary = SyncSummary {
        dry_run,
        ..SyncSummary::default()
    };

    for action in &plan.actions {
        if dry_run {
            log_dry_run(system, action);
            count(&mut summary, action);
            continue;
        }

        match execute(destination, action).await {
            Ok(()) => {
                record_success(action);
                count(&mut summary, action);
            }
            Err(e) => {
                let operation = e.operation().unwrap_or(StoreOperation::WriteData);
                metrics::increment_secret_failures(operation.as_str());
                summary.record_failure(action.name(), operation, &e);
            }
        }
    }

    if !dry_run {
        metrics::increment_secrets_unchanged(u64::try_from(summary.unchanged).unwrap_or(u64::MAX));
    }
    summary.log(system);
    summary
}

async fn execute(destination: &dyn SecretStore, action: &SyncAction) -> Result<(), StoreError> {
    let system = destination.system();
    match action {
        SyncAction::Create(secret) => {
            write_data(destination, secret).await?;
            write_tags(destination, secret).await?;
            info!(system, secret = %secret.name, "Created secret");
        }
        SyncAction::Update { secret, data, tags } => {
            if *data {
                write_data(destination, secret).await?;
            }
            if *tags {
                write_tags(destination, secret).await?;
            }
            info!(system, secret = %secret.name, data = *data, tags = *tags, "Updated secret");
        }
        SyncAction::Unchanged(name) => {
            debug!(system, secret = %name, "Secret already in sync");
        }
        SyncAction::Delete(name) => {
            observe(
                system,
                StoreOperation::Delete,
                destination.delete_secret(name).await,
            )?;
            info!(system, secret = %name, "Deleted secret");
        }
    }
    Ok(())
}

async fn write_data(destination: &dyn SecretStore, secret: &Secret) -> Result<(), StoreError> {
    observe(
        destination.system(),
        StoreOperation::WriteData,
        destination.write_secret_data(&secret.name, &secret.data).await,
    )
}

async fn write_tags(destination: &dyn SecretStore, secret: &Secret) -> Result<(), StoreError> {
    observe(
        destination.system(),
        StoreOperation::WriteTags,
        destination.write_secret_tags(&secret.name, &secret.tags).await,
    )
}

fn count(summary: &mut SyncSummary, action: &SyncAction) {
    match action {
        SyncAction::Create(_) => summary.created += 1,
        SyncAction::Update { .. } => summary.updated += 1,
        SyncAction::Unchanged(_) => summary.unchanged += 1,
        SyncAction::Delete(_) => summary.deleted += 1,
    }
}

fn record_success(action: &SyncAction) {
    match action {
        SyncAction::Create(_) => metrics::increment_secrets_created(),
        SyncAction::Update { .. } => metrics::increment_secrets_updated(),
        SyncAction::Delete(_) => metrics::increment_secrets_deleted(),
        SyncAction::Unchanged(_) => {}
    }
}

fn log_dry_run(system: &str, action: &SyncAction) {
    match action {
        SyncAction::Create(secret) => {
            info!(system, secret = %secret.name, "[dry run] Would create secret");
        }
        SyncAction::Update { secret, data, tags } => {
            info!(system, secret = %secret.name, data = *data, tags = *tags, "[dry run] Would update secret");
        }
        SyncAction::Delete(name) => {
            info!(system, secret = %name, "[dry run] Would delete secret");
        }
        SyncAction::Unchanged(_) => {}
    }
}
