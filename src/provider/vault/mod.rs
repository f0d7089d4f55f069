//! # HashiCorp Vault KV v2 Client
//!
//! Talks to the Vault HTTP API directly through `reqwest`.
//!
//! - Secrets live under a KV v2 secrets engine (`VAULT_SECRETS_ENGINE`), which is
//!   mounted on first use if it does not exist yet.
//! - Payloads are stored in the secret data, tags in the secret's
//!   `custom_metadata` (Vault only accepts string values there).
//! - Authentication uses a static token or a Kubernetes service-account login.

use crate::config::{VaultAuth, VaultConfig};
use crate::error::StoreError;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::info;

mod kv;
mod responses;

use responses::{LoginResponse, TokenLookupResponse};

/// Backend name used in logs and metrics
pub const SYSTEM: &str = "vault";

/// HashiCorp Vault provider implementation
pub struct VaultStore {
    client: Client,
    address: String,
    token: String,
    namespace: Option<String>,
    engine: String,
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl VaultStore {
    /// Connect and authenticate against Vault.
    ///
    /// Kubernetes auth exchanges the pod's service-account JWT for a client token;
    /// token auth validates the token with a self lookup.
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn connect(config: &VaultConfig) -> Result<Self, StoreError> {
        info!(
            system = SYSTEM,
            url = %config.address,
            secrets_engine = %config.engine,
            "Connecting to HashiCorp Vault"
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::connection(SYSTEM, format!("unable to initialize Vault client: {e}")))?;

        let mut store = Self {
            client,
            address: config.address.clone(),
            token: String::new(),
            namespace: config.namespace.clone(),
            engine: config.engine.clone(),
        };

        match &config.auth {
            VaultAuth::Token(token) => {
                store.token.clone_from(token);
                store.lookup_self().await?;
            }
            VaultAuth::Kubernetes {
                role,
                mount,
                token_path,
            } => {
                let jwt = tokio::fs::read_to_string(token_path).await.map_err(|e| {
                    StoreError::authentication(
                        SYSTEM,
                        format!("cannot read service account token {}: {e}", token_path.display()),
                    )
                })?;
                store.token = store.kubernetes_login(mount, role, jwt.trim()).await?;
                info!(system = SYSTEM, kubernetes_role = %role, "Logged in with Kubernetes auth");
            }
        }

        Ok(store)
    }

    /// Build a store around an existing token, without contacting Vault
    #[cfg(test)]
    fn with_token(
        address: impl Into<String>,
        token: impl Into<String>,
        engine: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            address: address.into(),
            token: token.into(),
            namespace: None,
            engine: engine.into(),
        }
    }

    async fn kubernetes_login(&self, mount: &str, role: &str, jwt: &str) -> Result<String, StoreError> {
        let path = format!("v1/auth/{}/login", mount.trim_matches('/'));
        let body = serde_json::json!({ "role": role, "jwt": jwt });
        let response = self
            .send(Method::POST, &path, Some(body))
            .await
            .map_err(|e| StoreError::connection(SYSTEM, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::authentication(
                SYSTEM,
                format!("unable to log in with Kubernetes auth: {status} {body}"),
            ));
        }

        let login: LoginResponse = decode(response)
            .await
            .map_err(|e| StoreError::authentication(SYSTEM, e))?;
        Ok(login.auth.client_token)
    }

    async fn lookup_self(&self) -> Result<(), StoreError> {
        let response = self
            .send(Method::GET, "v1/auth/token/lookup-self", None)
            .await
            .map_err(|e| StoreError::connection(SYSTEM, e))?;

        match response.status() {
            status if status.is_success() => {
                let lookup: TokenLookupResponse = decode(response)
                    .await
                    .map_err(|e| StoreError::authentication(SYSTEM, e))?;
                info!(
                    system = SYSTEM,
                    display_name = lookup.data.display_name.as_deref().unwrap_or("unknown"),
                    "Authenticated with Vault token"
                );
                Ok(())
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(StoreError::authentication(
                SYSTEM,
                "token rejected by Vault",
            )),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::connection(SYSTEM, format!("{status} {body}")))
            }
        }
    }

    /// API path under the secrets engine, e.g. `v1/secrets/data/apps/db`
    fn engine_path(&self, kind: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let engine = self.engine.trim_matches('/');
        if path.is_empty() {
            format!("v1/{engine}/{kind}")
        } else {
            format!("v1/{engine}/{kind}/{path}")
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
    ) -> Result<Response, reqwest::Error> {
        let url = format!(
            "{}/{}",
            self.address.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut builder = self.client.request(method, url);
        if !self.token.is_empty() {
            builder = builder.header("X-Vault-Token", &self.token);
        }
        if let Some(namespace) = &self.namespace {
            builder = builder.header("X-Vault-Namespace", namespace);
        }
        if let Some(payload) = body {
            builder = builder.json(&payload);
        }
        builder.send().await
    }
}

/// Decode a JSON response body, keeping the body in the error for diagnosis
async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, String> {
    let body = response.text().await.map_err(|e| e.to_string())?;
    serde_json::from_str(&body)
        .map_err(|e| format!("failed to decode Vault response: {e}; body={body}"))
}
