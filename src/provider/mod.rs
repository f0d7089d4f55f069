//! # Provider Modules
//!
//! Backend adapters for secret stores.
//!
//! Each backend implements [`SecretStore`]; the sync engine only ever talks to
//! that trait, so a run can be driven entirely against [`memory::MemoryStore`].

use crate::config::BackendConfig;
use crate::error::StoreError;
use crate::secret::SecretMap;
use async_trait::async_trait;

/// One secret as it appears in a backend listing
#[derive(Debug, Clone, PartialEq)]
pub struct SecretEntry {
    /// Store path of the secret
    pub name: String,
    /// Backend identifier used to fetch the secret (ARN, path, ...)
    pub id: String,
    /// Tags returned by the listing itself, if the backend includes them
    pub tags: SecretMap,
}

impl SecretEntry {
    /// Entry whose identifier is its name, with no listing tags
    #[must_use]
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            tags: SecretMap::new(),
        }
    }
}

/// Payload and tags fetched for one secret
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecretPayload {
    pub data: SecretMap,
    pub tags: SecretMap,
}

/// Read/write contract every secret store backend satisfies
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Backend name used in logs and metrics, e.g. `vault`
    fn system(&self) -> &'static str;

    /// Every secret known to the backend, fully paginated and flattened
    async fn list_all_secrets(&self) -> Result<Vec<SecretEntry>, StoreError>;

    /// Data and tags of one secret.
    ///
    /// A secret that has metadata but no live version yields empty data.
    async fn fetch_secret_data(&self, entry: &SecretEntry) -> Result<SecretPayload, StoreError>;

    /// Overwrite the payload of `name`, creating the secret if needed
    async fn write_secret_data(&self, name: &str, data: &SecretMap) -> Result<(), StoreError>;

    /// Overwrite the tags of `name`
    async fn write_secret_tags(&self, name: &str, tags: &SecretMap) -> Result<(), StoreError>;

    /// Remove `name` and its metadata
    async fn delete_secret(&self, name: &str) -> Result<(), StoreError>;

    /// Provision the underlying namespace if the backend needs it.
    ///
    /// Must be a no-op when already provisioned.
    async fn ensure_storage_ready(&self) -> Result<(), StoreError>;
}

/// Connect to the backend described by `config`.
///
/// Client construction and authentication happen here; failures are fatal.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub async fn connect(config: &BackendConfig) -> Result<Box<dyn SecretStore>, StoreError> {
    match config {
        BackendConfig::Aws(aws_config) => Ok(Box::new(
            aws::AwsSecretsManager::connect(aws_config).await?,
        )),
        BackendConfig::Vault(vault_config) => {
            Ok(Box::new(vault::VaultStore::connect(vault_config).await?))
        }
    }
}

pub mod aws;
pub mod memory;
pub mod vault;
