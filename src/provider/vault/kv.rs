//! # Vault KV v2 Operations
//!
//! Implements [`SecretStore`] for a KV v2 secrets engine.

use super::responses::{ListResponse, ReadDataResponse, ReadMetadataResponse};
use super::{decode, VaultStore, SYSTEM};
use crate::error::{StoreError, StoreOperation};
use crate::provider::{SecretEntry, SecretPayload, SecretStore};
use crate::secret::value::map_from_json;
use crate::secret::{SecretMap, Value};
use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Convert a tag map into Vault custom metadata, which only holds strings
pub(crate) fn tags_to_custom_metadata(tags: &SecretMap) -> BTreeMap<String, String> {
    tags.iter()
        .map(|(key, value)| (key.clone(), value.to_string()))
        .collect()
}

fn custom_metadata_to_tags(metadata: Option<BTreeMap<String, String>>) -> SecretMap {
    metadata
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

/// Whether a `sys/mounts` listing contains `engine`.
///
/// Newer Vault versions nest mounts under `data`, older ones list them at the top level.
pub(crate) fn mounts_contain(mounts: &JsonValue, engine: &str) -> bool {
    let key = format!("{}/", engine.trim_matches('/'));
    mounts.get(&key).is_some()
        || mounts
            .get("data")
            .and_then(|data| data.get(&key))
            .is_some()
}

/// Join a listing prefix and key into a secret path
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{key}")
    }
}

/// Turn a non-success response into a backend error carrying status and body
async fn check(
    response: Response,
    operation: StoreOperation,
    path: &str,
) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::backend(
        SYSTEM,
        operation,
        path,
        format!("{status} {}", body.trim()),
    ))
}

impl VaultStore {
    async fn call(
        &self,
        method: Method,
        api_path: &str,
        body: Option<JsonValue>,
        operation: StoreOperation,
        path: &str,
    ) -> Result<Response, StoreError> {
        self.send(method, api_path, body)
            .await
            .map_err(|e| StoreError::backend(SYSTEM, operation, path, e))
    }

    /// Keys directly under `prefix`; folders end with `/`
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let api_path = format!("{}?list=true", self.engine_path("metadata", prefix));
        let response = self
            .call(Method::GET, &api_path, None, StoreOperation::List, prefix)
            .await?;

        // Vault answers 404 for an empty folder
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let response = check(response, StoreOperation::List, prefix).await?;
        let listed: ListResponse = decode(response)
            .await
            .map_err(|e| StoreError::backend(SYSTEM, StoreOperation::List, prefix, e))?;
        Ok(listed.data.keys)
    }

    async fn read_custom_metadata(&self, path: &str) -> Result<SecretMap, StoreError> {
        let response = self
            .call(
                Method::GET,
                &self.engine_path("metadata", path),
                None,
                StoreOperation::Read,
                path,
            )
            .await?;
        let response = check(response, StoreOperation::Read, path).await?;
        let metadata: ReadMetadataResponse = decode(response)
            .await
            .map_err(|e| StoreError::backend(SYSTEM, StoreOperation::Read, path, e))?;
        Ok(custom_metadata_to_tags(metadata.data.custom_metadata))
    }
}

#[async_trait]
impl SecretStore for VaultStore {
    fn system(&self) -> &'static str {
        SYSTEM
    }

    async fn list_all_secrets(&self) -> Result<Vec<SecretEntry>, StoreError> {
        debug!(system = SYSTEM, secrets_engine = %self.engine, "Listing secrets");

        let mut entries = Vec::new();
        let mut folders = vec![String::new()];

        while let Some(prefix) = folders.pop() {
            for key in self.list_keys(&prefix).await? {
                let path = join_path(&prefix, &key);
                if key.ends_with('/') {
                    folders.push(path);
                } else {
                    entries.push(SecretEntry::from_name(path));
                }
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn fetch_secret_data(&self, entry: &SecretEntry) -> Result<SecretPayload, StoreError> {
        let path = entry.id.as_str();
        let response = self
            .call(
                Method::GET,
                &self.engine_path("data", path),
                None,
                StoreOperation::Read,
                path,
            )
            .await?;

        // No live version: the secret only exists as metadata
        if response.status() == StatusCode::NOT_FOUND {
            debug!(system = SYSTEM, path, "No live version, reading metadata only");
            return Ok(SecretPayload {
                data: SecretMap::new(),
                tags: self.read_custom_metadata(path).await?,
            });
        }

        let response = check(response, StoreOperation::Read, path).await?;
        let read: ReadDataResponse = decode(response)
            .await
            .map_err(|e| StoreError::backend(SYSTEM, StoreOperation::Read, path, e))?;

        let Some(read) = read.data else {
            return Ok(SecretPayload {
                data: SecretMap::new(),
                tags: self.read_custom_metadata(path).await?,
            });
        };

        let metadata = read.metadata.unwrap_or_default();
        let data = if metadata.is_deleted() {
            SecretMap::new()
        } else {
            read.data.and_then(map_from_json).unwrap_or_default()
        };

        let tags = match metadata.custom_metadata {
            Some(custom_metadata) => custom_metadata_to_tags(Some(custom_metadata)),
            None => self.read_custom_metadata(path).await?,
        };

        Ok(SecretPayload { data, tags })
    }

    async fn write_secret_data(&self, name: &str, data: &SecretMap) -> Result<(), StoreError> {
        let body = serde_json::json!({ "data": data });
        let response = self
            .call(
                Method::POST,
                &self.engine_path("data", name),
                Some(body),
                StoreOperation::WriteData,
                name,
            )
            .await?;
        check(response, StoreOperation::WriteData, name).await?;
        info!(system = SYSTEM, path = name, "Successfully wrote secret data");
        Ok(())
    }

    async fn write_secret_tags(&self, name: &str, tags: &SecretMap) -> Result<(), StoreError> {
        let body = serde_json::json!({ "custom_metadata": tags_to_custom_metadata(tags) });
        let response = self
            .call(
                Method::POST,
                &self.engine_path("metadata", name),
                Some(body),
                StoreOperation::WriteTags,
                name,
            )
            .await?;
        check(response, StoreOperation::WriteTags, name).await?;
        info!(system = SYSTEM, path = name, "Successfully wrote secret metadata");
        Ok(())
    }

    async fn delete_secret(&self, name: &str) -> Result<(), StoreError> {
        let response = self
            .call(
                Method::DELETE,
                &self.engine_path("metadata", name),
                None,
                StoreOperation::Delete,
                name,
            )
            .await?;
        check(response, StoreOperation::Delete, name).await?;
        info!(system = SYSTEM, path = name, "Deleted secret and all its versions");
        Ok(())
    }

    async fn ensure_storage_ready(&self) -> Result<(), StoreError> {
        let engine = self.engine.trim_matches('/');
        let response = self
            .call(
                Method::GET,
                "v1/sys/mounts",
                None,
                StoreOperation::Provision,
                engine,
            )
            .await?;
        let response = check(response, StoreOperation::Provision, engine).await?;
        let mounts: JsonValue = decode(response)
            .await
            .map_err(|e| StoreError::backend(SYSTEM, StoreOperation::Provision, engine, e))?;

        if mounts_contain(&mounts, engine) {
            debug!(system = SYSTEM, secrets_engine = engine, "Secrets engine already mounted");
            return Ok(());
        }

        let body = serde_json::json!({ "type": "kv", "options": { "version": "2" } });
        let response = self
            .call(
                Method::POST,
                &format!("v1/sys/mounts/{engine}"),
                Some(body),
                StoreOperation::Provision,
                engine,
            )
            .await?;
        check(response, StoreOperation::Provision, engine).await?;
        info!(system = SYSTEM, secrets_engine = engine, "Mounted kv v2 secrets engine");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_become_strings() {
        let tags = SecretMap::from([
            ("Environment".to_string(), Value::from("dev")),
            ("replicas".to_string(), Value::Integer(3)),
            ("enabled".to_string(), Value::Bool(true)),
        ]);
        let metadata = tags_to_custom_metadata(&tags);
        assert_eq!(metadata["Environment"], "dev");
        assert_eq!(metadata["replicas"], "3");
        assert_eq!(metadata["enabled"], "true");
    }

    #[test]
    fn test_missing_custom_metadata_is_empty() {
        assert!(custom_metadata_to_tags(None).is_empty());
    }

    #[test]
    fn test_mounts_contain() {
        let legacy = serde_json::json!({ "secrets/": { "type": "kv" }, "sys/": {} });
        assert!(mounts_contain(&legacy, "secrets"));

        let nested = serde_json::json!({ "data": { "kv/": { "type": "kv" } } });
        assert!(mounts_contain(&nested, "kv/"));
        assert!(!mounts_contain(&nested, "secrets"));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "apps/"), "apps/");
        assert_eq!(join_path("apps/", "db-dev"), "apps/db-dev");
    }
}
