//! # Sync Summary
//!
//! Outcome of applying a plan: counts per action and every per-secret failure.

use crate::error::StoreOperation;
use std::fmt;
use tracing::{info, warn};

/// One secret that could not be written or deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub name: String,
    pub operation: StoreOperation,
    pub message: String,
}

/// Counts of a reconciliation, with failures noted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failures: Vec<SyncFailure>,
    /// Counts describe what would have happened; nothing was written
    pub dry_run: bool,
}

impl SyncSummary {
    /// Number of secrets created, updated or deleted
    #[must_use]
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn record_failure(
        &mut self,
        name: impl Into<String>,
        operation: StoreOperation,
        message: impl fmt::Display,
    ) {
        self.failures.push(SyncFailure {
            name: name.into(),
            operation,
            message: message.to_string(),
        });
    }

    /// `success`, or `partial` when some secrets failed
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        if self.has_failures() {
            "partial"
        } else {
            "success"
        }
    }

    /// Log the counts, then one line per failure
    pub fn log(&self, system: &str) {
        info!(
            system,
            created = self.created,
            updated = self.updated,
            deleted = self.deleted,
            unchanged = self.unchanged,
            failed = self.failures.len(),
            dry_run = self.dry_run,
            "Sync finished"
        );
        for failure in &self.failures {
            warn!(
                system,
                secret = %failure.name,
                operation = %failure.operation,
                error = %failure.message,
                "Secret failed to sync"
            );
        }
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} deleted={} unchanged={} failed={}",
            self.created,
            self.updated,
            self.deleted,
            self.unchanged,
            self.failures.len()
        )?;
        if self.dry_run {
            f.write_str(" (dry run)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_and_display() {
        let mut summary = SyncSummary {
            created: 1,
            updated: 2,
            deleted: 3,
            unchanged: 4,
            ..SyncSummary::default()
        };
        assert_eq!(summary.changes(), 6);
        assert_eq!(summary.outcome(), "success");
        assert_eq!(
            summary.to_string(),
            "created=1 updated=2 deleted=3 unchanged=4 failed=0"
        );

        summary.record_failure("db", StoreOperation::Delete, "permission denied");
        summary.dry_run = true;
        assert_eq!(summary.outcome(), "partial");
        assert!(summary.to_string().ends_with("failed=1 (dry run)"));
    }
}
