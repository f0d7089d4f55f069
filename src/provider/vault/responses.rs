//! Response bodies returned by the Vault HTTP API.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub(super) struct LoginResponse {
    pub auth: LoginAuth,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginAuth {
    pub client_token: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenLookupResponse {
    pub data: TokenLookupData,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenLookupData {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// `LIST <engine>/metadata/<path>`
#[derive(Debug, Deserialize)]
pub(super) struct ListResponse {
    pub data: ListData,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListData {
    #[serde(default)]
    pub keys: Vec<String>,
}

/// `GET <engine>/data/<path>`
#[derive(Debug, Deserialize)]
pub(super) struct ReadDataResponse {
    pub data: Option<ReadData>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReadData {
    #[serde(default)]
    pub data: Option<JsonValue>,
    #[serde(default)]
    pub metadata: Option<VersionMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct VersionMetadata {
    #[serde(default)]
    pub deletion_time: String,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default)]
    pub custom_metadata: Option<BTreeMap<String, String>>,
}

impl VersionMetadata {
    /// A soft-deleted or destroyed version carries no usable data
    pub fn is_deleted(&self) -> bool {
        self.destroyed || !self.deletion_time.is_empty()
    }
}

/// `GET <engine>/metadata/<path>`
#[derive(Debug, Deserialize)]
pub(super) struct ReadMetadataResponse {
    pub data: ReadMetadata,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReadMetadata {
    #[serde(default)]
    pub custom_metadata: Option<BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_data_with_deleted_version() {
        let body = r#"{
            "data": {
                "data": null,
                "metadata": {
                    "created_time": "2024-01-01T00:00:00Z",
                    "deletion_time": "2024-02-01T00:00:00Z",
                    "destroyed": false,
                    "custom_metadata": {"Environment": "dev"},
                    "version": 3
                }
            }
        }"#;
        let parsed: ReadDataResponse = serde_json::from_str(body).unwrap();
        let data = parsed.data.unwrap();
        assert!(data.data.is_none());
        let metadata = data.metadata.unwrap();
        assert!(metadata.is_deleted());
        assert_eq!(
            metadata.custom_metadata.unwrap()["Environment"],
            "dev".to_string()
        );
    }

    #[test]
    fn test_list_without_keys() {
        let parsed: ListResponse = serde_json::from_str(r#"{"data": {}}"#).unwrap();
        assert!(parsed.data.keys.is_empty());
    }
}
