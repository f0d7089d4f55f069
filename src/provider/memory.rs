//! # In-Memory Store
//!
//! A [`SecretStore`] backed by a map, used to drive sync runs without a real
//! backend. Individual operations can be made to fail for a given secret so
//! that per-secret error isolation can be exercised.

use crate::error::{StoreError, StoreOperation};
use crate::provider::{SecretEntry, SecretPayload, SecretStore};
use crate::secret::SecretMap;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Backend name used in logs and metrics
pub const SYSTEM: &str = "memory";

#[derive(Debug, Default)]
struct State {
    secrets: BTreeMap<String, SecretPayload>,
    failures: HashSet<(String, StoreOperation)>,
    fail_listing: bool,
    ready: bool,
    data_writes: usize,
    tag_writes: usize,
    deletes: usize,
}

/// Secret store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret, builder style
    #[must_use]
    pub fn with_secret(self, name: impl Into<String>, data: SecretMap, tags: SecretMap) -> Self {
        self.insert(name, data, tags);
        self
    }

    /// Make `operation` fail for `name`, builder style
    #[must_use]
    pub fn failing_on(self, name: impl Into<String>, operation: StoreOperation) -> Self {
        self.fail_on(name, operation);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, name: impl Into<String>, data: SecretMap, tags: SecretMap) {
        self.state()
            .secrets
            .insert(name.into(), SecretPayload { data, tags });
    }

    /// Current payload and tags of `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SecretPayload> {
        self.state().secrets.get(name).cloned()
    }

    /// Names of all stored secrets, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.state().secrets.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state().secrets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().secrets.is_empty()
    }

    pub fn fail_on(&self, name: impl Into<String>, operation: StoreOperation) {
        self.state().failures.insert((name.into(), operation));
    }

    /// Make every listing fail
    pub fn fail_listing(&self) {
        self.state().fail_listing = true;
    }

    /// Whether [`SecretStore::ensure_storage_ready`] has run
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state().ready
    }

    /// Number of successful data writes, tag writes and deletes, in that order
    #[must_use]
    pub fn mutation_counts(&self) -> (usize, usize, usize) {
        let state = self.state();
        (state.data_writes, state.tag_writes, state.deletes)
    }

    fn check(state: &State, name: &str, operation: StoreOperation) -> Result<(), StoreError> {
        if state.failures.contains(&(name.to_string(), operation)) {
            return Err(StoreError::backend(
                SYSTEM,
                operation,
                name,
                "injected failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    fn system(&self) -> &'static str {
        SYSTEM
    }

    async fn list_all_secrets(&self) -> Result<Vec<SecretEntry>, StoreError> {
        let state = self.state();
        if state.fail_listing {
            return Err(StoreError::backend(
                SYSTEM,
                StoreOperation::List,
                "",
                "injected failure",
            ));
        }

        Ok(state
            .secrets
            .keys()
            .map(|name| SecretEntry::from_name(name.clone()))
            .collect())
    }

    async fn fetch_secret_data(&self, entry: &SecretEntry) -> Result<SecretPayload, StoreError> {
        let state = self.state();
        Self::check(&state, &entry.name, StoreOperation::Read)?;
        state.secrets.get(&entry.id).cloned().ok_or_else(|| {
            StoreError::backend(SYSTEM, StoreOperation::Read, &entry.name, "secret not found")
        })
    }

    async fn write_secret_data(&self, name: &str, data: &SecretMap) -> Result<(), StoreError> {
        let mut state = self.state();
        Self::check(&state, name, StoreOperation::WriteData)?;
        state.secrets.entry(name.to_string()).or_default().data = data.clone();
        state.data_writes += 1;
        Ok(())
    }

    async fn write_secret_tags(&self, name: &str, tags: &SecretMap) -> Result<(), StoreError> {
        let mut state = self.state();
        Self::check(&state, name, StoreOperation::WriteTags)?;
        state.secrets.entry(name.to_string()).or_default().tags = tags.clone();
        state.tag_writes += 1;
        Ok(())
    }

    async fn delete_secret(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        Self::check(&state, name, StoreOperation::Delete)?;
        if state.secrets.remove(name).is_none() {
            return Err(StoreError::backend(
                SYSTEM,
                StoreOperation::Delete,
                name,
                "secret not found",
            ));
        }
        state.deletes += 1;
        Ok(())
    }

    async fn ensure_storage_ready(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        Self::check(&state, "", StoreOperation::Provision)?;
        state.ready = true;
        Ok(())
    }
}
