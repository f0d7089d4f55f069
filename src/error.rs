//! # Errors
//!
//! Error taxonomy for a sync run.
//!
//! - [`ConfigError`]: bad or missing configuration, fatal before any work starts
//! - [`StoreError`]: a backend call failed; fatal for connection, login, listing
//!   and provisioning, recovered per secret for reads, writes and deletes
//! - [`SyncError`]: what a whole run can fail with

use std::fmt;
use thiserror::Error;

/// Invalid process configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not defined")]
    MissingVariable(String),

    #[error("{variable}={value} is not a supported backend, expected one of: aws, vault")]
    UnknownBackend { variable: String, value: String },

    #[error("'{0}' is not an accepted environment, expected one of: dev, test, staging, prod, nonprod, global")]
    UnknownEnvironment(String),

    #[error("cannot parse tag filter '{0}', expected KEY=VALUE pairs separated by ';'")]
    InvalidTagFilter(String),

    #[error("invalid value for {variable}: '{value}' ({reason})")]
    InvalidValue {
        variable: String,
        value: String,
        reason: String,
    },

    #[error("{variable_a} or {variable_b} must be defined to authenticate against {system}")]
    MissingCredentials {
        system: &'static str,
        variable_a: String,
        variable_b: String,
    },
}

/// A backend operation, used to label failures and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    List,
    Read,
    WriteData,
    WriteTags,
    Delete,
    Provision,
}

impl StoreOperation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::List => "list",
            StoreOperation::Read => "read",
            StoreOperation::WriteData => "write_data",
            StoreOperation::WriteTags => "write_tags",
            StoreOperation::Delete => "delete",
            StoreOperation::Provision => "provision",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend call failed
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to connect to {system}: {message}")]
    Connection {
        system: &'static str,
        message: String,
    },

    #[error("authentication against {system} failed: {message}")]
    Authentication {
        system: &'static str,
        message: String,
    },

    #[error("{system}: {operation} failed for '{path}': {message}")]
    Backend {
        system: &'static str,
        operation: StoreOperation,
        path: String,
        message: String,
    },
}

impl StoreError {
    pub fn backend(
        system: &'static str,
        operation: StoreOperation,
        path: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        StoreError::Backend {
            system,
            operation,
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn connection(system: &'static str, message: impl fmt::Display) -> Self {
        StoreError::Connection {
            system,
            message: message.to_string(),
        }
    }

    pub fn authentication(system: &'static str, message: impl fmt::Display) -> Self {
        StoreError::Authentication {
            system,
            message: message.to_string(),
        }
    }

    /// The operation that failed, if the error came from a backend call
    #[must_use]
    pub fn operation(&self) -> Option<StoreOperation> {
        match self {
            StoreError::Backend { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// A sync run could not complete
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
