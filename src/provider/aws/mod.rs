//! # AWS Secrets Manager Client
//!
//! Client for interacting with AWS Secrets Manager API.
//!
//! This module provides functionality to:
//! - List secrets (with their tags) across all result pages
//! - Read secret values, parsed as JSON objects
//! - Create, update, re-tag and delete secrets
//! - Assume an IAM role through STS before talking to Secrets Manager

use crate::config::AwsConfig;
use crate::error::StoreError;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use tracing::{info, warn};

mod secrets_manager;

/// Backend name used in logs and metrics
pub const SYSTEM: &str = "aws-secrets-manager";

/// Session name used when assuming `AWS_ROLE_ARN`
const ROLE_SESSION_NAME: &str = "secret-sync";

/// AWS Secrets Manager provider implementation
pub struct AwsSecretsManager {
    client: SecretsManagerClient,
    region: String,
}

impl std::fmt::Debug for AwsSecretsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsManager")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsSecretsManager {
    /// Create a new AWS Secrets Manager client and verify its credentials.
    ///
    /// Uses the default credential chain, then assumes `role_arn` when configured.
    /// The resulting identity is checked with `sts:GetCallerIdentity` so that a
    /// bad session fails at startup rather than on the first listing.
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn connect(config: &AwsConfig) -> Result<Self, StoreError> {
        let region = config.region.clone();

        let sdk_config = match &config.role_arn {
            Some(role_arn) => {
                info!(system = SYSTEM, region = %region, role = %role_arn, "Assuming AWS role");
                Self::create_assume_role_config(&region, role_arn).await
            }
            None => Self::create_default_config(&region).await,
        };

        Self::verify_credentials(&sdk_config).await?;

        info!(system = SYSTEM, region = %region, "AWS session created successfully");

        Ok(Self {
            client: SecretsManagerClient::new(&sdk_config),
            region,
        })
    }

    /// Create AWS SDK config using default credential chain
    async fn create_default_config(region: &str) -> SdkConfig {
        aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await
    }

    /// Create AWS SDK config whose credentials come from assuming `role_arn`
    async fn create_assume_role_config(region: &str, role_arn: &str) -> SdkConfig {
        let base_config = Self::create_default_config(region).await;

        let provider = aws_config::sts::AssumeRoleProvider::builder(role_arn)
            .session_name(ROLE_SESSION_NAME)
            .configure(&base_config)
            .build()
            .await;

        aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .credentials_provider(provider)
            .load()
            .await
    }

    async fn verify_credentials(sdk_config: &SdkConfig) -> Result<(), StoreError> {
        let sts = aws_sdk_sts::Client::new(sdk_config);
        match sts.get_caller_identity().send().await {
            Ok(identity) => {
                info!(
                    system = SYSTEM,
                    identity = identity.arn().unwrap_or("unknown"),
                    "Verified AWS credentials"
                );
                Ok(())
            }
            Err(e) => {
                let details = aws_sdk_sts::error::DisplayErrorContext(&e).to_string();
                warn!(system = SYSTEM, error = %details, "Failed to create AWS session");
                Err(StoreError::authentication(SYSTEM, details))
            }
        }
    }
}

/// Render an SDK error with its full source chain
fn error_details<E: std::error::Error>(e: &E) -> String {
    DisplayErrorContext(e).to_string()
}
