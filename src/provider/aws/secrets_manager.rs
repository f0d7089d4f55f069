//! # AWS Secrets Manager Operations
//!
//! Implements [`SecretStore`] for AWS Secrets Manager.
//!
//! Secret payloads are stored as a JSON object in the secret string. Tags are
//! native Secrets Manager tags; their values are always strings.

use super::{error_details, AwsSecretsManager, SYSTEM};
use crate::error::{StoreError, StoreOperation};
use crate::provider::{SecretEntry, SecretPayload, SecretStore};
use crate::secret::value::{map_from_json, map_to_json};
use crate::secret::{SecretMap, Value};
use async_trait::async_trait;
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use aws_sdk_secretsmanager::operation::list_secrets::ListSecretsOutput;
use aws_sdk_secretsmanager::operation::put_secret_value::PutSecretValueError;
use aws_sdk_secretsmanager::types::Tag;
use tracing::{debug, info};

/// Payload key used for secrets whose value is not a JSON object
pub const PLAIN_VALUE_KEY: &str = "value";

/// Parse a secret string into a payload.
///
/// JSON objects become the payload as-is; any other content is kept verbatim
/// under [`PLAIN_VALUE_KEY`].
pub(crate) fn parse_secret_string(secret_string: &str) -> SecretMap {
    serde_json::from_str::<serde_json::Value>(secret_string)
        .ok()
        .and_then(map_from_json)
        .unwrap_or_else(|| {
            SecretMap::from([(
                PLAIN_VALUE_KEY.to_string(),
                Value::from(secret_string),
            )])
        })
}

/// Convert listing tags (`[{Key, Value}]`) into a tag map
fn tags_to_map(tags: &[Tag]) -> SecretMap {
    tags.iter()
        .filter_map(|tag| {
            let key = tag.key()?;
            Some((key.to_string(), Value::from(tag.value().unwrap_or_default())))
        })
        .collect()
}

#[async_trait]
impl SecretStore for AwsSecretsManager {
    fn system(&self) -> &'static str {
        SYSTEM
    }

    async fn list_all_secrets(&self) -> Result<Vec<SecretEntry>, StoreError> {
        debug!(system = SYSTEM, region = %self.region, "Listing secrets");

        let pages = self
            .client
            .list_secrets()
            .into_paginator()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await
            .map_err(|e| StoreError::backend(SYSTEM, StoreOperation::List, "", error_details(&e)))?;

        let entries = pages
            .iter()
            .flat_map(ListSecretsOutput::secret_list)
            .filter_map(|secret| {
                let name = secret.name()?.to_string();
                let id = secret.arn().map_or_else(|| name.clone(), ToString::to_string);
                Some(SecretEntry {
                    name,
                    id,
                    tags: tags_to_map(secret.tags()),
                })
            })
            .collect();

        Ok(entries)
    }

    async fn fetch_secret_data(&self, entry: &SecretEntry) -> Result<SecretPayload, StoreError> {
        let read = self
            .client
            .get_secret_value()
            .secret_id(&entry.id)
            .send()
            .await;

        let response = match read {
            Ok(response) => response,
            // Listed but without an AWSCURRENT version: the secret exists, its data is empty
            Err(e)
                if e.as_service_error()
                    .is_some_and(GetSecretValueError::is_resource_not_found_exception) =>
            {
                debug!(system = SYSTEM, path = %entry.name, "No live version, keeping tags only");
                return Ok(SecretPayload {
                    data: SecretMap::new(),
                    tags: entry.tags.clone(),
                });
            }
            Err(e) => {
                return Err(StoreError::backend(
                    SYSTEM,
                    StoreOperation::Read,
                    &entry.name,
                    error_details(&e),
                ))
            }
        };

        let data = if let Some(secret_string) = response.secret_string() {
            parse_secret_string(secret_string)
        } else if let Some(blob) = response.secret_binary() {
            parse_secret_string(&String::from_utf8_lossy(blob.as_ref()))
        } else {
            SecretMap::new()
        };

        Ok(SecretPayload {
            data,
            tags: entry.tags.clone(),
        })
    }

    async fn write_secret_data(&self, name: &str, data: &SecretMap) -> Result<(), StoreError> {
        let secret_string = map_to_json(data).to_string();

        let put = self
            .client
            .put_secret_value()
            .secret_id(name)
            .secret_string(&secret_string)
            .send()
            .await;

        match put {
            Ok(_) => {
                info!(system = SYSTEM, path = name, "Successfully put secret value");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(PutSecretValueError::is_resource_not_found_exception) =>
            {
                self.client
                    .create_secret()
                    .name(name)
                    .secret_string(secret_string)
                    .send()
                    .await
                    .map_err(|e| {
                        StoreError::backend(SYSTEM, StoreOperation::WriteData, name, error_details(&e))
                    })?;
                info!(system = SYSTEM, path = name, "Successfully created secret");
                Ok(())
            }
            Err(e) => Err(StoreError::backend(
                SYSTEM,
                StoreOperation::WriteData,
                name,
                error_details(&e),
            )),
        }
    }

    async fn write_secret_tags(&self, name: &str, tags: &SecretMap) -> Result<(), StoreError> {
        let to_error =
            |message: String| StoreError::backend(SYSTEM, StoreOperation::WriteTags, name, message);

        // Tags are replaced as a whole: drop keys that are no longer wanted
        let described = self
            .client
            .describe_secret()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| to_error(error_details(&e)))?;

        let stale: Vec<String> = described
            .tags()
            .iter()
            .filter_map(Tag::key)
            .filter(|key| !tags.contains_key(*key))
            .map(ToString::to_string)
            .collect();

        if !stale.is_empty() {
            self.client
                .untag_resource()
                .secret_id(name)
                .set_tag_keys(Some(stale))
                .send()
                .await
                .map_err(|e| to_error(error_details(&e)))?;
        }

        if !tags.is_empty() {
            let aws_tags = tags
                .iter()
                .map(|(key, value)| Tag::builder().key(key).value(value.to_string()).build())
                .collect();
            self.client
                .tag_resource()
                .secret_id(name)
                .set_tags(Some(aws_tags))
                .send()
                .await
                .map_err(|e| to_error(error_details(&e)))?;
        }

        info!(system = SYSTEM, path = name, "Successfully put tags to secret");
        Ok(())
    }

    async fn delete_secret(&self, name: &str) -> Result<(), StoreError> {
        self.client
            .delete_secret()
            .secret_id(name)
            .force_delete_without_recovery(true)
            .send()
            .await
            .map_err(|e| {
                StoreError::backend(SYSTEM, StoreOperation::Delete, name, error_details(&e))
            })?;
        info!(system = SYSTEM, path = name, "Deleted secret");
        Ok(())
    }

    async fn ensure_storage_ready(&self) -> Result<(), StoreError> {
        // Secrets Manager has no namespace to provision
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_secretsmanager::config::{BehaviorVersion, Credentials, Region};
    use pact_consumer::prelude::*;
    use serde_json::json;

    const AMZ_JSON: &str = "application/x-amz-json-1.1";

    /// Client pointed at a mock endpoint with static credentials
    fn store_for(endpoint: &str) -> AwsSecretsManager {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let config = aws_sdk_secretsmanager::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-central-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .endpoint_url(endpoint.trim_end_matches('/'))
            .build();
        AwsSecretsManager {
            client: aws_sdk_secretsmanager::Client::from_conf(config),
            region: "eu-central-1".to_string(),
        }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_list_then_read_secret_without_live_version() {
        let mut pact_builder = PactBuilder::new("secret-sync", "AWS-Secrets-Manager");
        pact_builder
            .interaction("list secrets with their tags", "", |mut i| {
                i.given("two secrets exist");
                i.request
                    .method("POST")
                    .path("/")
                    .header("x-amz-target", "secretsmanager.ListSecrets");
                i.response
                    .status(200)
                    .header("content-type", AMZ_JSON)
                    .json_body(json!({
                        "SecretList": [
                            {
                                "ARN": "arn:aws:secretsmanager:eu-central-1:123456789012:secret:apps/db-dev-AbCdEf",
                                "Name": "apps/db-dev",
                                "Tags": [{ "Key": "team", "Value": "payments" }]
                            },
                            {
                                "ARN": "arn:aws:secretsmanager:eu-central-1:123456789012:secret:apps/api-prod-GhIjKl",
                                "Name": "apps/api-prod"
                            }
                        ]
                    }));
                i
            })
            .interaction("read a secret that has no current version", "", |mut i| {
                i.given("apps/db-dev has no AWSCURRENT version");
                i.request
                    .method("POST")
                    .path("/")
                    .header("x-amz-target", "secretsmanager.GetSecretValue");
                i.response
                    .status(400)
                    .header("content-type", AMZ_JSON)
                    .header("x-amzn-errortype", "ResourceNotFoundException")
                    .json_body(json!({
                        "__type": "ResourceNotFoundException",
                        "Message": "Secrets Manager can't find the specified secret value for staging label: AWSCURRENT"
                    }));
                i
            });

        let mock_server = pact_builder.start_mock_server(None, None);
        let store = store_for(mock_server.url().as_str());

        let (entries, payload) = block_on(async {
            let entries = store.list_all_secrets().await.unwrap();
            let payload = store.fetch_secret_data(&entries[0]).await.unwrap();
            (entries, payload)
        });

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["apps/db-dev", "apps/api-prod"]);
        assert!(entries[0].id.ends_with("apps/db-dev-AbCdEf"));

        // Still listed, so it can be synced with its tags or deleted as stale
        assert!(payload.data.is_empty());
        assert_eq!(payload.tags["team"], Value::from("payments"));
    }

    #[test]
    fn test_parse_json_object_secret() {
        let data = parse_secret_string(r#"{"username": "admin", "port": 5432}"#);
        assert_eq!(data["username"], Value::from("admin"));
        assert_eq!(data["port"], Value::Integer(5432));
    }

    #[test]
    fn test_parse_plain_secret() {
        let data = parse_secret_string("hunter2");
        assert_eq!(data.len(), 1);
        assert_eq!(data[PLAIN_VALUE_KEY], Value::from("hunter2"));

        // A JSON array is not a payload either
        let data = parse_secret_string("[1,2]");
        assert_eq!(data[PLAIN_VALUE_KEY], Value::from("[1,2]"));
    }

    #[test]
    fn test_tags_to_map() {
        let tags = vec![
            Tag::builder().key("Environment").value("dev").build(),
            Tag::builder().key("team").build(),
            Tag::builder().value("orphan").build(),
        ];
        let map = tags_to_map(&tags);
        assert_eq!(map.len(), 2);
        assert_eq!(map["Environment"], Value::from("dev"));
        assert_eq!(map["team"], Value::from(""));
    }
}
