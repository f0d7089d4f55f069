//! # Fetch and Scope
//!
//! Turns a backend listing into the list of secrets in scope for a sync target.
//!
//! For an environment target, each secret is fetched, its environment resolved,
//! and it is kept only when it belongs to the target. When the target is a
//! single environment (not `nonprod`/`global`) the environment suffix is
//! trimmed from the kept names, so `db-password-dev` is written as `db-password`.

use super::observe;
use crate::error::{StoreError, StoreOperation};
use crate::provider::SecretStore;
use crate::secret::{Environment, Secret};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Which secrets of a store to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Secrets belonging to the environment, trimmed unless it is a group
    Environment(Environment),
    /// Every secret, untouched; used for the destination's current state
    All,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Environment(env) => write!(f, "{env}"),
            Scope::All => f.write_str("all"),
        }
    }
}

/// Preference between secrets that trim to the same name; lower wins
fn specificity(secret: &Secret, target: Environment) -> u8 {
    match secret.environment {
        Some(env) if env == target => 0,
        Some(Environment::Nonprod) => 1,
        Some(Environment::Global) => 2,
        _ => 3,
    }
}

/// Fetch every secret of `store` and keep those in `scope`.
///
/// A secret that cannot be read is logged and skipped. A listing failure is
/// returned as an error since nothing meaningful can be synced without it.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub async fn get_scoped_secrets(
    store: &dyn SecretStore,
    scope: Scope,
) -> Result<Vec<Secret>, StoreError> {
    let system = store.system();
    let entries = observe(system, StoreOperation::List, store.list_all_secrets().await)?;
    debug!(system, count = entries.len(), scope = %scope, "Listed secrets");

    let mut scoped: Vec<Secret> = Vec::with_capacity(entries.len());
    // Store path each kept secret came from, parallel to `scoped`
    let mut origins: Vec<&str> = Vec::with_capacity(entries.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for entry in &entries {
        let payload = match observe(
            system,
            StoreOperation::Read,
            store.fetch_secret_data(entry).await,
        ) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(system, path = %entry.name, error = %e, "Skipping secret that could not be read");
                skipped += 1;
                continue;
            }
        };

        let mut secret = Secret::new(entry.name.clone())
            .with_data(payload.data)
            .with_tags(payload.tags);
        secret.set_environment();

        let Scope::Environment(target) = scope else {
            scoped.push(secret);
            continue;
        };

        if !secret.belongs_to(Some(target)) {
            debug!(
                system,
                path = %secret.name,
                environment = secret.environment.map_or("none", Environment::name),
                "Secret not in scope"
            );
            continue;
        }

        if !target.is_group() {
            secret.trim_name_environment();
        }

        match positions.get(&secret.name) {
            None => {
                positions.insert(secret.name.clone(), scoped.len());
                scoped.push(secret);
                origins.push(entry.name.as_str());
            }
            Some(&index) => {
                let kept_rank = specificity(&scoped[index], target);
                let new_rank = specificity(&secret, target);
                if new_rank < kept_rank {
                    debug!(
                        system,
                        secret = %secret.name,
                        replaced = origins[index],
                        kept = %entry.name,
                        "Replacing less specific secret with the same name"
                    );
                    scoped[index] = secret;
                    origins[index] = entry.name.as_str();
                } else if new_rank == kept_rank {
                    warn!(
                        system,
                        secret = %secret.name,
                        kept = origins[index],
                        ignored = %entry.name,
                        "Two secrets resolve to the same name, keeping the first"
                    );
                }
            }
        }
    }

    info!(
        system,
        scope = %scope,
        listed = entries.len(),
        in_scope = scoped.len(),
        skipped,
        "Fetched scoped secrets"
    );
    Ok(scoped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::memory::MemoryStore;
    use crate::secret::{SecretMap, Value, ENVIRONMENT_TAG};

    fn data(value: &str) -> SecretMap {
        SecretMap::from([("value".to_string(), Value::from(value))])
    }

    fn env_tag(env: &str) -> SecretMap {
        SecretMap::from([(ENVIRONMENT_TAG.to_string(), Value::from(env))])
    }

    fn names(secrets: &[Secret]) -> Vec<&str> {
        let mut names: Vec<&str> = secrets.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[tokio::test]
    async fn test_trims_for_concrete_environment() {
        let store = MemoryStore::new()
            .with_secret("apps/my-app/db-password-dev", data("a"), SecretMap::new())
            .with_secret("apps/my-app/db-password-prod", data("b"), SecretMap::new());

        let scoped = get_scoped_secrets(&store, Scope::Environment(Environment::Dev))
            .await
            .unwrap();
        assert_eq!(names(&scoped), vec!["apps/my-app/db-password"]);
        assert_eq!(scoped[0].environment, Some(Environment::Dev));
    }

    #[tokio::test]
    async fn test_keeps_names_for_group() {
        let store = MemoryStore::new()
            .with_secret("apps/my-app/db-password-dev", data("a"), SecretMap::new())
            .with_secret("apps/my-app/db-password-test", data("b"), SecretMap::new())
            .with_secret("apps/my-app/db-password-prod", data("c"), SecretMap::new());

        let scoped = get_scoped_secrets(&store, Scope::Environment(Environment::Nonprod))
            .await
            .unwrap();
        assert_eq!(
            names(&scoped),
            vec!["apps/my-app/db-password-dev", "apps/my-app/db-password-test"]
        );
    }

    #[tokio::test]
    async fn test_unresolvable_secret_is_excluded() {
        let store = MemoryStore::new()
            .with_secret("db", data("a"), SecretMap::new())
            .with_secret("cache", data("b"), env_tag("staging"));

        let scoped = get_scoped_secrets(&store, Scope::Environment(Environment::Global))
            .await
            .unwrap();
        assert_eq!(names(&scoped), vec!["cache"]);
    }

    #[tokio::test]
    async fn test_scope_all_keeps_everything_untrimmed() {
        let store = MemoryStore::new()
            .with_secret("db", data("a"), SecretMap::new())
            .with_secret("cache-prod", data("b"), SecretMap::new());

        let scoped = get_scoped_secrets(&store, Scope::All).await.unwrap();
        assert_eq!(names(&scoped), vec!["cache-prod", "db"]);
    }

    #[tokio::test]
    async fn test_read_failure_skips_secret() {
        let store = MemoryStore::new()
            .with_secret("db-dev", data("a"), SecretMap::new())
            .with_secret("cache-dev", data("b"), SecretMap::new())
            .failing_on("db-dev", StoreOperation::Read);

        let scoped = get_scoped_secrets(&store, Scope::Environment(Environment::Dev))
            .await
            .unwrap();
        assert_eq!(names(&scoped), vec!["cache"]);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let store = MemoryStore::new().with_secret("db-dev", data("a"), SecretMap::new());
        store.fail_listing();

        let err = get_scoped_secrets(&store, Scope::Environment(Environment::Dev))
            .await
            .unwrap_err();
        assert_eq!(err.operation(), Some(StoreOperation::List));
    }

    #[tokio::test]
    async fn test_most_specific_environment_wins_collision() {
        let store = MemoryStore::new()
            .with_secret("db-global", data("global"), SecretMap::new())
            .with_secret("db-nonprod", data("nonprod"), SecretMap::new())
            .with_secret("db-dev", data("dev"), SecretMap::new());

        let scoped = get_scoped_secrets(&store, Scope::Environment(Environment::Dev))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name, "db");
        assert_eq!(scoped[0].data, data("dev"));
    }

    #[tokio::test]
    async fn test_equal_specificity_keeps_first_listed() {
        // `db` tagged dev and `db-dev` both resolve to dev and to the name `db`
        let store = MemoryStore::new()
            .with_secret("db", data("tagged"), env_tag("dev"))
            .with_secret("db-dev", data("suffixed"), SecretMap::new());

        let scoped = get_scoped_secrets(&store, Scope::Environment(Environment::Dev))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].data, data("tagged"));
    }
}
