//! # Sync Plan
//!
//! The diff between the desired secrets and the destination's current secrets.
//!
//! Computing the plan is pure: no backend is touched, which makes it usable for
//! dry runs and straightforward to test. Secrets are matched by exact name; a
//! rename therefore shows up as a delete of the old name and a create of the new one.

use crate::secret::Secret;
use std::collections::{HashMap, HashSet};

/// What to do with one secret
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Not in the destination: write data and tags
    Create(Secret),
    /// In the destination with different data and/or tags
    Update {
        secret: Secret,
        data: bool,
        tags: bool,
    },
    /// Already in sync
    Unchanged(String),
    /// In the destination only
    Delete(String),
}

impl SyncAction {
    /// Name of the secret the action applies to
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            SyncAction::Create(secret) | SyncAction::Update { secret, .. } => &secret.name,
            SyncAction::Unchanged(name) | SyncAction::Delete(name) => name,
        }
    }
}

/// Ordered list of actions; every delete comes after every create and update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
}

impl SyncPlan {
    /// Diff `desired` against `current`.
    ///
    /// If `desired` holds the same name twice, the first one is used.
    #[must_use]
    pub fn compute(desired: &[Secret], current: &[Secret]) -> Self {
        let current_by_name: HashMap<&str, &Secret> =
            current.iter().map(|c| (c.name.as_str(), c)).collect();
        let mut seen: HashSet<&str> = HashSet::with_capacity(desired.len());
        let mut actions = Vec::with_capacity(desired.len() + current.len());

        for wanted in desired {
            if !seen.insert(wanted.name.as_str()) {
                continue;
            }
            let action = match current_by_name.get(wanted.name.as_str()) {
                None => SyncAction::Create(wanted.clone()),
                Some(existing) => {
                    let data = !wanted.data_eq(existing);
                    let tags = !wanted.tags_eq(existing);
                    if data || tags {
                        SyncAction::Update {
                            secret: wanted.clone(),
                            data,
                            tags,
                        }
                    } else {
                        SyncAction::Unchanged(wanted.name.clone())
                    }
                }
            };
            actions.push(action);
        }

        let mut deleted: HashSet<&str> = HashSet::new();
        for existing in current {
            let name = existing.name.as_str();
            if !seen.contains(name) && deleted.insert(name) {
                actions.push(SyncAction::Delete(existing.name.clone()));
            }
        }

        Self { actions }
    }

    #[must_use]
    pub fn creates(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Create(_)))
    }

    #[must_use]
    pub fn updates(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Update { .. }))
    }

    #[must_use]
    pub fn deletes(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Delete(_)))
    }

    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Unchanged(_)))
    }

    /// True when applying the plan would not write anything
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.actions
            .iter()
            .all(|a| matches!(a, SyncAction::Unchanged(_)))
    }

    fn count(&self, predicate: impl Fn(&SyncAction) -> bool) -> usize {
        self.actions.iter().filter(|a| predicate(a)).count()
    }
}
