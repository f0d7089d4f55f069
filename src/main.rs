//! # Secret Sync
//!
//! One-shot job that reconciles a source secret store into a destination store.
//!
//! ## Usage
//!
//! ```bash
//! ENVIRONMENT=dev SOURCE_SYSTEM=aws DEST_SYSTEM=vault \
//!   VAULT_ADDR=https://vault:8200 VAULT_KUBERNETES_ROLE=secret-sync \
//!   secret-sync
//!
//! # Preview the changes for staging without writing anything
//! secret-sync --environment staging --dry-run
//! ```
//!
//! The process exits non-zero on configuration, connection, provisioning or
//! listing errors. Individual secrets that fail to sync are logged and the
//! process still exits zero.

use anyhow::{Context, Result};
use clap::Parser;
use secret_sync::config::{LogFormat, SyncConfig};
use secret_sync::constants::{ENV_DRY_RUN, ENV_ENVIRONMENT, ENV_FILTER_TAGS, ENV_LOG_FORMAT};
use secret_sync::observability::{self, metrics};
use secret_sync::provider;
use secret_sync::sync::{self, RunOptions};
use std::collections::HashMap;
use tracing::{error, info};

/// Reconcile secrets between AWS Secrets Manager and HashiCorp Vault
#[derive(Parser, Debug)]
#[command(name = "secret-sync", version, about, long_about = None)]
struct Cli {
    /// Target environment, overrides ENVIRONMENT
    #[arg(short, long)]
    environment: Option<String>,

    /// Compute and log the plan without writing, overrides DRY_RUN
    #[arg(long)]
    dry_run: bool,

    /// Tag filter as KEY=VALUE pairs separated by ';', overrides FILTER_TAGS
    #[arg(long)]
    filter_tags: Option<String>,

    /// Log output format, overrides LOG_FORMAT
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Flags given on the command line, keyed by the variable they override
    fn overrides(&self) -> HashMap<&'static str, String> {
        let mut overrides = HashMap::new();
        if let Some(environment) = &self.environment {
            overrides.insert(ENV_ENVIRONMENT, environment.clone());
        }
        if self.dry_run {
            overrides.insert(ENV_DRY_RUN, "true".to_string());
        }
        if let Some(filter) = &self.filter_tags {
            overrides.insert(ENV_FILTER_TAGS, filter.clone());
        }
        if let Some(format) = self.log_format {
            let format = match format {
                LogFormat::Text => "text",
                LogFormat::Json => "json",
            };
            overrides.insert(ENV_LOG_FORMAT, format.to_string());
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider before any TLS client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .unwrap_or_else(|_| panic!("Failed to install rustls crypto provider"));

    let cli = Cli::parse();
    let overrides = cli.overrides();
    let config = SyncConfig::from_lookup(|key| {
        overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    })
    .context("Invalid configuration")?;

    if let Err(e) = observability::init_logging(&config.log) {
        eprintln!("Tracing subscriber already initialized: {e}");
    }

    info!("Starting secret-sync");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    metrics::register_metrics()?;

    let result = sync_once(&config).await;

    if let Some(path) = &config.metrics_textfile {
        if let Err(e) = metrics::write_textfile(path) {
            error!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    let summary = result?;
    info!(summary = %summary, "Done");
    Ok(())
}

async fn sync_once(config: &SyncConfig) -> Result<sync::SyncSummary> {
    let source = provider::connect(&config.source)
        .await
        .context("Failed to connect to the source secret store")?;
    let destination = provider::connect(&config.destination)
        .await
        .context("Failed to connect to the destination secret store")?;

    let options = RunOptions {
        environment: config.environment,
        filter: config.filter.clone(),
        dry_run: config.dry_run,
    };

    sync::run(source.as_ref(), destination.as_ref(), &options)
        .await
        .with_context(|| format!("Sync for environment {} failed", config.environment))
}
