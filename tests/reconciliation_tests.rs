//! # Reconciliation Integration Tests
//!
//! Drives `reconcile` against the in-memory store.
//!
//! These tests verify:
//! - Convergence: creates, updates and deletes bring the destination in line
//! - Idempotence: a second run against an unchanged source writes nothing
//! - Per-secret failure isolation
//! - Equality that tolerates numeric representation drift

mod common;

use common::{init_tracing, ints, strings};
use secret_sync::error::StoreOperation;
use secret_sync::provider::memory::MemoryStore;
use secret_sync::secret::{Secret, SecretMap, Value};
use secret_sync::sync::reconcile;

#[tokio::test]
async fn test_convergence_creates_updates_and_deletes() {
    init_tracing();
    let team = strings(&[("team", "payments")]);
    let destination = MemoryStore::new()
        .with_secret("B", ints(&[("y", 1)]), team.clone())
        .with_secret("C", ints(&[("z", 3)]), SecretMap::new());
    let desired = vec![
        Secret::new("A").with_data(ints(&[("x", 1)])),
        Secret::new("B").with_data(ints(&[("y", 2)])).with_tags(team.clone()),
    ];

    let summary = reconcile(&desired, &destination, false).await.unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.unchanged, 0);
    assert!(!summary.has_failures());

    assert_eq!(destination.names(), vec!["A", "B"]);
    let b = destination.get("B").unwrap();
    assert_eq!(b.data, ints(&[("y", 2)]));
    assert_eq!(b.tags, team);

    // A: data + tags, B: data only, C: delete
    assert_eq!(destination.mutation_counts(), (2, 1, 1));
}

#[tokio::test]
async fn test_second_run_is_a_noop() {
    init_tracing();
    let destination = MemoryStore::new().with_secret("stale", ints(&[("a", 1)]), SecretMap::new());
    let desired = vec![
        Secret::new("apps/api/token")
            .with_data(strings(&[("token", "abc")]))
            .with_tags(strings(&[("owner", "platform")])),
        Secret::new("apps/api/db").with_data(ints(&[("port", 5432)])),
    ];

    let first = reconcile(&desired, &destination, false).await.unwrap();
    assert_eq!(first.changes(), 3);
    let writes_after_first = destination.mutation_counts();

    let second = reconcile(&desired, &destination, false).await.unwrap();
    assert_eq!(second.changes(), 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(destination.mutation_counts(), writes_after_first);
}

#[tokio::test]
async fn test_failures_do_not_stop_remaining_work() {
    init_tracing();
    let destination = MemoryStore::new()
        .with_secret("keep-me", ints(&[("a", 1)]), SecretMap::new())
        .with_secret("gone", ints(&[("a", 1)]), SecretMap::new())
        .with_secret("tagged", ints(&[("a", 1)]), SecretMap::new())
        .failing_on("keep-me", StoreOperation::Delete)
        .failing_on("tagged", StoreOperation::WriteTags);
    let desired = vec![
        Secret::new("new").with_data(ints(&[("b", 2)])),
        Secret::new("tagged")
            .with_data(ints(&[("a", 1)]))
            .with_tags(strings(&[("team", "payments")])),
    ];

    let summary = reconcile(&desired, &destination, false).await.unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.failures.len(), 2);

    let mut failed: Vec<(&str, StoreOperation)> = summary
        .failures
        .iter()
        .map(|f| (f.name.as_str(), f.operation))
        .collect();
    failed.sort_by_key(|(name, _)| *name);
    assert_eq!(
        failed,
        vec![
            ("keep-me", StoreOperation::Delete),
            ("tagged", StoreOperation::WriteTags),
        ]
    );

    assert_eq!(destination.names(), vec!["keep-me", "new", "tagged"]);
}

#[tokio::test]
async fn test_representation_drift_is_not_rewritten() {
    init_tracing();
    // Written by another tool as floats and nested JSON
    let stored = SecretMap::from([
        ("port".to_string(), Value::Float(5432.0)),
        (
            "hosts".to_string(),
            Value::from(serde_json::json!(["db-1", "db-2"])),
        ),
    ]);
    let destination = MemoryStore::new().with_secret("db", stored, SecretMap::new());

    let desired = vec![Secret::new("db").with_data(SecretMap::from([
        ("port".to_string(), Value::Integer(5432)),
        (
            "hosts".to_string(),
            Value::Sequence(vec![Value::from("db-1"), Value::from("db-2")]),
        ),
    ]))];

    let summary = reconcile(&desired, &destination, false).await.unwrap();
    assert_eq!(summary.unchanged, 1);
    assert_eq!(destination.mutation_counts(), (0, 0, 0));
}

#[tokio::test]
async fn test_empty_desired_clears_destination() {
    init_tracing();
    let destination = MemoryStore::new()
        .with_secret("a", ints(&[("x", 1)]), SecretMap::new())
        .with_secret("b", ints(&[("x", 1)]), SecretMap::new());

    let summary = reconcile(&[], &destination, false).await.unwrap();
    assert_eq!(summary.deleted, 2);
    assert!(destination.is_empty());
}
