//! # Sync Configuration
//!
//! Process settings loaded once at startup from environment variables.
//!
//! Loading goes through a lookup function rather than `std::env` directly, so
//! the driver can overlay command-line flags and tests can supply a map.
//! Every problem is a [`ConfigError`] and aborts the run before any backend
//! is contacted.

use crate::constants::*;
use crate::error::ConfigError;
use crate::secret::{Environment, TagFilter};
use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Aws,
    Vault,
}

impl BackendKind {
    fn parse(variable: &str, value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "aws" => Ok(BackendKind::Aws),
            "vault" => Ok(BackendKind::Vault),
            _ => Err(ConfigError::UnknownBackend {
                variable: variable.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Which end of the sync a backend sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl Side {
    /// Prefix of this side's backend variables
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Side::Source => SOURCE_PREFIX,
            Side::Destination => DEST_PREFIX,
        }
    }

    /// Variable selecting this side's backend kind
    #[must_use]
    pub fn system_variable(self) -> &'static str {
        match self {
            Side::Source => ENV_SOURCE_SYSTEM,
            Side::Destination => ENV_DEST_SYSTEM,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Destination => f.write_str("destination"),
        }
    }
}

/// AWS Secrets Manager connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    pub region: String,
    /// IAM role assumed through STS before any call
    pub role_arn: Option<String>,
}

/// How to authenticate against Vault
#[derive(Clone, PartialEq, Eq)]
pub enum VaultAuth {
    Token(String),
    Kubernetes {
        role: String,
        /// Mount path of the Kubernetes auth method
        mount: String,
        /// Service account JWT to log in with
        token_path: PathBuf,
    },
}

impl fmt::Debug for VaultAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultAuth::Token(_) => f.write_str("Token(<redacted>)"),
            VaultAuth::Kubernetes {
                role,
                mount,
                token_path,
            } => f
                .debug_struct("Kubernetes")
                .field("role", role)
                .field("mount", mount)
                .field("token_path", token_path)
                .finish(),
        }
    }
}

/// Vault KV v2 connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub address: String,
    pub auth: VaultAuth,
    /// Mount path of the KV v2 secrets engine
    pub engine: String,
    /// Enterprise namespace sent as `X-Vault-Namespace`
    pub namespace: Option<String>,
    pub timeout: Duration,
}

/// Backend selected for one side of the sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Aws(AwsConfig),
    Vault(VaultConfig),
}

impl BackendConfig {
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Aws(_) => BackendKind::Aws,
            BackendConfig::Vault(_) => BackendKind::Vault,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level for this crate when `RUST_LOG` is not set
    pub level: Level,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::default(),
        }
    }
}

/// Everything one sync run needs
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub environment: Environment,
    pub source: BackendConfig,
    pub destination: BackendConfig,
    pub filter: TagFilter,
    pub dry_run: bool,
    pub log: LogConfig,
    pub metrics_textfile: Option<PathBuf>,
}

impl SyncConfig {
    /// Load configuration from the process environment
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup: &lookup };

        let environment = vars.required(ENV_ENVIRONMENT)?.parse::<Environment>()?;
        let source = vars.backend(Side::Source)?;
        let destination = vars.backend(Side::Destination)?;
        let filter = vars
            .get(ENV_FILTER_TAGS)
            .map_or_else(|| Ok(TagFilter::default()), |raw| TagFilter::parse(&raw))?;
        let dry_run = vars.get(ENV_DRY_RUN).is_some_and(|v| parse_bool(&v));

        let format = match vars.get(ENV_LOG_FORMAT) {
            Some(raw) => LogFormat::from_str(&raw, true).map_err(|reason| {
                ConfigError::InvalidValue {
                    variable: ENV_LOG_FORMAT.to_string(),
                    value: raw.clone(),
                    reason,
                }
            })?,
            None => LogFormat::default(),
        };
        let level = match vars.get(ENV_LOG_LEVEL) {
            Some(raw) => raw.trim().parse::<Level>().map_err(|e| ConfigError::InvalidValue {
                variable: ENV_LOG_LEVEL.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_LOG_LEVEL,
        };
        let log = LogConfig { level, format };

        Ok(Self {
            environment,
            source,
            destination,
            filter,
            dry_run,
            log,
            metrics_textfile: vars.get(ENV_METRICS_TEXTFILE).map(PathBuf::from),
        })
    }
}

/// Read environment variable as boolean
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

struct Vars<'a, F> {
    lookup: &'a F,
}

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    /// Side-prefixed variable, falling back to the unprefixed one
    fn side(&self, side: Side, key: &str) -> Option<String> {
        self.get(&format!("{}{key}", side.prefix()))
            .or_else(|| self.get(key))
    }

    fn side_required(&self, side: Side, key: &str) -> Result<String, ConfigError> {
        self.side(side, key).ok_or_else(|| {
            ConfigError::MissingVariable(format!("{}{key} (or {key})", side.prefix()))
        })
    }

    fn backend(&self, side: Side) -> Result<BackendConfig, ConfigError> {
        let variable = side.system_variable();
        let kind = BackendKind::parse(variable, &self.required(variable)?)?;
        match kind {
            BackendKind::Aws => Ok(BackendConfig::Aws(self.aws(side))),
            BackendKind::Vault => Ok(BackendConfig::Vault(self.vault(side)?)),
        }
    }

    fn aws(&self, side: Side) -> AwsConfig {
        AwsConfig {
            region: self
                .side(side, ENV_AWS_REGION)
                .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            role_arn: self.side(side, ENV_AWS_ROLE_ARN),
        }
    }

    fn vault(&self, side: Side) -> Result<VaultConfig, ConfigError> {
        let address = self.side_required(side, ENV_VAULT_ADDR)?;

        // A Kubernetes role wins over a static token
        let auth = match (
            self.side(side, ENV_VAULT_KUBERNETES_ROLE),
            self.side(side, ENV_VAULT_TOKEN),
        ) {
            (Some(role), _) => VaultAuth::Kubernetes {
                role,
                mount: self
                    .side(side, ENV_VAULT_KUBERNETES_AUTH_PATH)
                    .unwrap_or_else(|| DEFAULT_VAULT_KUBERNETES_AUTH_PATH.to_string()),
                token_path: self
                    .side(side, ENV_VAULT_KUBERNETES_TOKEN_PATH)
                    .unwrap_or_else(|| DEFAULT_VAULT_KUBERNETES_TOKEN_PATH.to_string())
                    .into(),
            },
            (None, Some(token)) => VaultAuth::Token(token),
            (None, None) => {
                return Err(ConfigError::MissingCredentials {
                    system: crate::provider::vault::SYSTEM,
                    variable_a: ENV_VAULT_KUBERNETES_ROLE.to_string(),
                    variable_b: ENV_VAULT_TOKEN.to_string(),
                })
            }
        };

        let timeout_secs = match self.side(side, ENV_VAULT_HTTP_TIMEOUT_SECS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    variable: ENV_VAULT_HTTP_TIMEOUT_SECS.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => DEFAULT_VAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(VaultConfig {
            address,
            auth,
            engine: self
                .side(side, ENV_VAULT_SECRETS_ENGINE)
                .unwrap_or_else(|| DEFAULT_VAULT_SECRETS_ENGINE.to_string()),
            namespace: self.side(side, ENV_VAULT_NAMESPACE),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
