//! End-to-end reconciliation behavior against the in-memory store.

use std::sync::Arc;

use uagen_backend::reconciler::SessionReconciler;
use uagen_backend::store::ProfileStore;
use uagen_backend::test_util::{session, MemoryProfileStore};
use uagen_common::Role;

#[tokio::test]
async fn first_account_becomes_approved_admin() {
    let store = Arc::new(MemoryProfileStore::new());
    let reconciler = SessionReconciler::new(store);

    let user = reconciler.observe_session(&session("u1", "first@x.com")).await;
    assert!(user.approved);
    assert_eq!(user.role, Role::Admin);
    assert_eq!(user.agent_limit, Some(500));
}

#[tokio::test]
async fn later_accounts_start_unapproved() {
    let store = Arc::new(MemoryProfileStore::new());
    let reconciler = SessionReconciler::new(store);

    reconciler.observe_session(&session("u1", "first@x.com")).await;
    let second = reconciler.observe_session(&session("u2", "second@x.com")).await;
    assert!(!second.approved);
    assert_eq!(second.role, Role::User);
}

#[tokio::test]
async fn reobservation_refreshes_mirrored_fields_and_keeps_authorization() {
    let store = Arc::new(MemoryProfileStore::new());
    let reconciler = SessionReconciler::new(store.clone());

    reconciler.observe_session(&session("u1", "old@x.com")).await;
    let first_login = store
        .fetch_by_identity("u1")
        .await
        .unwrap()
        .unwrap()
        .last_login
        .unwrap();

    let again = reconciler.observe_session(&session("u1", "new@x.com")).await;
    assert!(again.approved);
    assert_eq!(again.role, Role::Admin);
    assert_eq!(again.email.as_deref(), Some("new@x.com"));

    let record = store.fetch_by_identity("u1").await.unwrap().unwrap();
    assert_eq!(record.email.as_deref(), Some("new@x.com"));
    assert!(record.last_login.unwrap() >= first_login);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn losing_a_create_race_converges_on_the_existing_row() {
    let store = Arc::new(MemoryProfileStore::new());
    let reconciler = SessionReconciler::new(store.clone());

    // Seed the row, then make fetch miss it: the reconciler sees no row,
    // inserts, hits the unique constraint, and must retry as an update.
    reconciler.observe_session(&session("u1", "a@x.com")).await;
    store.hide_from_fetch("u1");

    let user = reconciler.observe_session(&session("u1", "a@x.com")).await;
    assert!(user.approved);
    assert_eq!(user.role, Role::Admin);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn approval_takes_effect_on_next_observation() {
    let store = Arc::new(MemoryProfileStore::new());
    let reconciler = SessionReconciler::new(store.clone());

    reconciler.observe_session(&session("admin", "admin@x.com")).await;
    let pending = reconciler.observe_session(&session("u2", "u2@x.com")).await;
    assert!(!pending.approved);

    let record = store.fetch_by_identity("u2").await.unwrap().unwrap();
    store.set_approval(record.id, true).await.unwrap();

    let approved = reconciler.observe_session(&session("u2", "u2@x.com")).await;
    assert!(approved.approved);
    assert_eq!(approved.role, Role::User);
}

#[tokio::test]
async fn store_outage_is_temporary_degradation_not_data_loss() {
    let store = Arc::new(MemoryProfileStore::new());
    let reconciler = SessionReconciler::new(store.clone());

    let before = reconciler.observe_session(&session("u1", "a@x.com")).await;
    assert!(before.approved);

    store.set_failing(true);
    let degraded = reconciler.observe_session(&session("u1", "a@x.com")).await;
    assert!(!degraded.approved);
    assert!(degraded.agent_limit.is_none());

    store.set_failing(false);
    let recovered = reconciler.observe_session(&session("u1", "a@x.com")).await;
    assert!(recovered.approved);
    assert_eq!(recovered.role, Role::Admin);
}
