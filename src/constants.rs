//! # Constants
//!
//! Environment variable names and defaults shared by configuration and the driver.
//!
//! Backend variables (`AWS_*`, `VAULT_*`) are looked up with the side prefix
//! first (`SOURCE_` or `DEST_`) and then without it.

/// Target sync environment
pub const ENV_ENVIRONMENT: &str = "ENVIRONMENT";

/// Source backend kind, `aws` or `vault`
pub const ENV_SOURCE_SYSTEM: &str = "SOURCE_SYSTEM";

/// Destination backend kind, `aws` or `vault`
pub const ENV_DEST_SYSTEM: &str = "DEST_SYSTEM";

/// Prefix of source-side backend variables
pub const SOURCE_PREFIX: &str = "SOURCE_";

/// Prefix of destination-side backend variables
pub const DEST_PREFIX: &str = "DEST_";

/// Tag filter, `KEY=VALUE` pairs separated by `;`
pub const ENV_FILTER_TAGS: &str = "FILTER_TAGS";

/// Compute and log the plan without writing
pub const ENV_DRY_RUN: &str = "DRY_RUN";

pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Path of the Prometheus textfile written at exit
pub const ENV_METRICS_TEXTFILE: &str = "METRICS_TEXTFILE";

pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_AWS_ROLE_ARN: &str = "AWS_ROLE_ARN";

pub const ENV_VAULT_ADDR: &str = "VAULT_ADDR";
pub const ENV_VAULT_TOKEN: &str = "VAULT_TOKEN";
pub const ENV_VAULT_KUBERNETES_ROLE: &str = "VAULT_KUBERNETES_ROLE";
pub const ENV_VAULT_KUBERNETES_AUTH_PATH: &str = "VAULT_KUBERNETES_AUTH_PATH";
pub const ENV_VAULT_KUBERNETES_TOKEN_PATH: &str = "VAULT_KUBERNETES_TOKEN_PATH";
pub const ENV_VAULT_SECRETS_ENGINE: &str = "VAULT_SECRETS_ENGINE";
pub const ENV_VAULT_NAMESPACE: &str = "VAULT_NAMESPACE";
pub const ENV_VAULT_HTTP_TIMEOUT_SECS: &str = "VAULT_HTTP_TIMEOUT_SECS";

/// Default AWS region
pub const DEFAULT_AWS_REGION: &str = "eu-central-1";

/// Default KV v2 mount path
pub const DEFAULT_VAULT_SECRETS_ENGINE: &str = "secrets";

/// Default mount path of the Kubernetes auth method
pub const DEFAULT_VAULT_KUBERNETES_AUTH_PATH: &str = "kubernetes";

/// Service account token mounted into every pod
pub const DEFAULT_VAULT_KUBERNETES_TOKEN_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Default timeout of a single Vault HTTP request (seconds)
pub const DEFAULT_VAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Default log level when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: tracing::Level = tracing::Level::INFO;
