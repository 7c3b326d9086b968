//! `SQLite` store tests
//!
//! Same contract as the memory store, enforced by the schema instead.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use trueno_ab::assignment::AssignmentService;
use trueno_ab::experiment::{Variant, VariantDraft};
use trueno_ab::store::{AssignmentStore, SqliteStore};
use trueno_ab::variants::VariantSetService;
use trueno_ab::Error;

fn pair() -> Vec<VariantDraft> {
    vec![VariantDraft::new("A", 50), VariantDraft::new("B", 50)]
}

#[tokio::test]
async fn test_sqlite_variants_in_creation_order() {
    let store = SqliteStore::open_in_memory().unwrap();
    let saved = store
        .replace_variant_set(
            "exp",
            vec![
                VariantDraft::new("c", 20),
                VariantDraft::new("a", 30),
                VariantDraft::new("b", 50),
            ],
        )
        .await
        .unwrap();

    let keys: Vec<&str> = saved.iter().map(Variant::key).collect();
    assert_eq!(keys, vec!["C", "A", "B"]);
    assert_eq!(store.find_variants("exp").await.unwrap(), saved);
}

#[tokio::test]
async fn test_sqlite_replace_deletes_only_missing_variant() {
    let store = SqliteStore::open_in_memory().unwrap();
    let saved = store
        .replace_variant_set(
            "exp",
            vec![
                VariantDraft::new("A", 40),
                VariantDraft::new("B", 30),
                VariantDraft::new("C", 30),
            ],
        )
        .await
        .unwrap();

    let next = store
        .replace_variant_set(
            "exp",
            vec![
                VariantDraft::existing(saved[0].id(), "A", 70),
                VariantDraft::existing(saved[2].id(), "C", 30),
                VariantDraft::new("D", 0),
            ],
        )
        .await
        .unwrap();

    let keys: Vec<&str> = next.iter().map(Variant::key).collect();
    assert_eq!(keys, vec!["A", "C", "D"]);
    assert_eq!(next[0].id(), saved[0].id());
    assert_eq!(next[0].weight(), 70);
    assert_eq!(next[1].created_at(), saved[2].created_at());
}

#[tokio::test]
async fn test_sqlite_replace_rolls_back_on_referenced_delete() {
    let store = SqliteStore::open_in_memory().unwrap();
    let saved = store.replace_variant_set("exp", pair()).await.unwrap();
    store
        .create_assignment("exp", "user-1", saved[1].id())
        .await
        .unwrap();

    let result = store
        .replace_variant_set(
            "exp",
            vec![
                VariantDraft::existing(saved[0].id(), "A", 10),
                VariantDraft::new("C", 90),
            ],
        )
        .await;

    assert!(matches!(result, Err(Error::Persistence(_))));
    assert_eq!(store.find_variants("exp").await.unwrap(), saved);
}

#[tokio::test]
async fn test_sqlite_replace_rejects_foreign_id() {
    let store = SqliteStore::open_in_memory().unwrap();
    let other = store.replace_variant_set("other", pair()).await.unwrap();
    let mine = store.replace_variant_set("exp", pair()).await.unwrap();

    let result = store
        .replace_variant_set(
            "exp",
            vec![
                VariantDraft::existing(other[0].id(), "A", 50),
                VariantDraft::new("Z", 50),
            ],
        )
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(store.find_variants("exp").await.unwrap(), mine);
}

#[tokio::test]
async fn test_sqlite_create_rejects_variant_of_other_experiment() {
    let store = SqliteStore::open_in_memory().unwrap();
    let other = store.replace_variant_set("other", pair()).await.unwrap();
    store.replace_variant_set("exp", pair()).await.unwrap();

    let result = store.create_assignment("exp", "user-1", other[0].id()).await;
    assert!(matches!(result, Err(Error::Persistence(_))));
}

#[tokio::test]
async fn test_sqlite_assignment_round_trip() {
    let store = SqliteStore::open_in_memory().unwrap();
    let saved = store.replace_variant_set("exp", pair()).await.unwrap();

    let created = store
        .create_assignment("exp", "user-1", saved[0].id())
        .await
        .unwrap();
    let found = store.find_assignment("exp", "user-1").await.unwrap();

    assert_eq!(found, Some(created));
    assert!(store.find_assignment("exp", "user-2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sqlite_service_end_to_end() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    VariantSetService::new(Arc::clone(&store))
        .save("exp", &pair())
        .await
        .unwrap();
    let service = AssignmentService::new(Arc::clone(&store));

    let first = service.assign("exp", "user-1").await.unwrap();
    let again = service.assign("exp", "user-1").await.unwrap();
    service.assign("exp", "user-2").await.unwrap();

    assert!(first.is_new);
    assert_eq!(first.assignment, again.assignment);

    let listed = service.list("exp").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].user_id(), "user-2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_concurrent_first_assign_binds_once() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    store.replace_variant_set("exp", pair()).await.unwrap();
    let service = Arc::new(AssignmentService::new(Arc::clone(&store)));

    let mut handles = vec![];
    for _ in 0..32 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.assign("exp", "racer").await.unwrap()
        }));
    }

    let mut variant_ids = vec![];
    for handle in handles {
        variant_ids.push(handle.await.unwrap().assignment.variant_id().to_string());
    }

    assert!(variant_ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(store.list_assignments("exp").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sqlite_file_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!("trueno-ab-{}.db", uuid::Uuid::new_v4()));
    let assignment = {
        let store = SqliteStore::open(&path).unwrap();
        let saved = store.replace_variant_set("exp", pair()).await.unwrap();
        store
            .create_assignment("exp", "user-1", saved[0].id())
            .await
            .unwrap()
    };

    let reopened = SqliteStore::open(&path).unwrap();
    let found = reopened.find_assignment("exp", "user-1").await.unwrap();
    assert_eq!(found, Some(assignment));

    drop(reopened);
    let _ = std::fs::remove_file(&path);
}
