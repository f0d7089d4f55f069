//! # Scoping Integration Tests
//!
//! Fetch-and-scope and tag filtering against the in-memory store.
//!
//! These tests verify:
//! - Environment resolution precedence as seen through a store
//! - Suffix trimming for single environments, none for groups
//! - `nonprod` and `global` membership
//! - Tag filter narrowing

mod common;

use common::{env_tag, init_tracing, ints, strings};
use secret_sync::provider::memory::MemoryStore;
use secret_sync::secret::{filter_by_tags, Environment, Secret, SecretMap, TagFilter};
use secret_sync::sync::{get_scoped_secrets, Scope};

fn sorted_names(secrets: &[Secret]) -> Vec<String> {
    let mut names: Vec<String> = secrets.iter().map(|s| s.name.clone()).collect();
    names.sort();
    names
}

/// One secret per environment plus an unscoped one and a tag-scoped one
fn mixed_store() -> MemoryStore {
    let store = MemoryStore::new();
    for env in Environment::ALL {
        store.insert(
            format!("apps/api/key-{env}"),
            ints(&[("n", 1)]),
            SecretMap::new(),
        );
    }
    store.insert("apps/api/unscoped", ints(&[("n", 1)]), SecretMap::new());
    store.insert("apps/api/flag", ints(&[("n", 1)]), env_tag("staging"));
    store
}

#[tokio::test]
async fn test_trim_on_sync_for_single_environment() {
    init_tracing();
    let store = MemoryStore::new().with_secret(
        "apps/my-app/db-password-dev",
        strings(&[("password", "hunter2")]),
        SecretMap::new(),
    );

    let dev = get_scoped_secrets(&store, Scope::Environment(Environment::Dev))
        .await
        .unwrap();
    assert_eq!(sorted_names(&dev), vec!["apps/my-app/db-password"]);

    let nonprod = get_scoped_secrets(&store, Scope::Environment(Environment::Nonprod))
        .await
        .unwrap();
    assert_eq!(sorted_names(&nonprod), vec!["apps/my-app/db-password-dev"]);
}

#[tokio::test]
async fn test_staging_scope() {
    init_tracing();
    let scoped = get_scoped_secrets(&mixed_store(), Scope::Environment(Environment::Staging))
        .await
        .unwrap();

    // staging itself, nonprod and global all trim to `key`; staging wins
    assert_eq!(sorted_names(&scoped), vec!["apps/api/flag", "apps/api/key"]);
    let key = scoped.iter().find(|s| s.name == "apps/api/key").unwrap();
    assert_eq!(key.environment, Some(Environment::Staging));
}

#[tokio::test]
async fn test_prod_scope_excludes_nonprod() {
    init_tracing();
    let store = MemoryStore::new()
        .with_secret("db-nonprod", ints(&[("n", 1)]), SecretMap::new())
        .with_secret("db-global", ints(&[("n", 2)]), SecretMap::new());

    let scoped = get_scoped_secrets(&store, Scope::Environment(Environment::Prod))
        .await
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].name, "db");
    assert_eq!(scoped[0].environment, Some(Environment::Global));
}

#[tokio::test]
async fn test_nonprod_scope_keeps_every_non_production_secret() {
    init_tracing();
    let scoped = get_scoped_secrets(&mixed_store(), Scope::Environment(Environment::Nonprod))
        .await
        .unwrap();
    assert_eq!(
        sorted_names(&scoped),
        vec![
            "apps/api/flag",
            "apps/api/key-dev",
            "apps/api/key-global",
            "apps/api/key-nonprod",
            "apps/api/key-staging",
            "apps/api/key-test",
        ]
    );
}

#[tokio::test]
async fn test_global_scope_keeps_every_resolvable_secret() {
    init_tracing();
    let scoped = get_scoped_secrets(&mixed_store(), Scope::Environment(Environment::Global))
        .await
        .unwrap();
    assert_eq!(scoped.len(), 7);
    assert!(scoped.iter().all(|s| s.name != "apps/api/unscoped"));
}

#[tokio::test]
async fn test_name_suffix_wins_over_environment_tag() {
    init_tracing();
    let store = MemoryStore::new().with_secret("db-prod", ints(&[("n", 1)]), env_tag("dev"));

    let dev = get_scoped_secrets(&store, Scope::Environment(Environment::Dev))
        .await
        .unwrap();
    assert!(dev.is_empty());

    let prod = get_scoped_secrets(&store, Scope::Environment(Environment::Prod))
        .await
        .unwrap();
    assert_eq!(sorted_names(&prod), vec!["db"]);
}

#[tokio::test]
async fn test_tag_filter_after_scoping() {
    init_tracing();
    let store = MemoryStore::new()
        .with_secret("a-dev", ints(&[("n", 1)]), strings(&[("team", "payments")]))
        .with_secret("b-dev", ints(&[("n", 1)]), strings(&[("team", "search")]))
        .with_secret("c-dev", ints(&[("n", 1)]), SecretMap::new());

    let scoped = get_scoped_secrets(&store, Scope::Environment(Environment::Dev))
        .await
        .unwrap();

    let filter = TagFilter::parse("team=payments").unwrap();
    let filtered = filter_by_tags(scoped.clone(), &filter);
    assert!(filtered.applied);
    assert_eq!(sorted_names(&filtered.secrets), vec!["a"]);

    let unfiltered = filter_by_tags(scoped.clone(), &TagFilter::default());
    assert!(!unfiltered.applied);
    assert_eq!(unfiltered.secrets, scoped);
}
