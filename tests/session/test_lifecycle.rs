//! Full lifecycle scenarios across create, authorize and invalidate.

use super::support::{manager_with, FakeStoreApi};
use session_vault::{
    slots, AuthorizedPayload, InMemoryKeyValueStore, KeyValueStore, SessionManager,
    SessionManagerError, SoftwareCustodian,
};
use std::sync::Arc;

#[tokio::test]
async fn test_create_authorize_invalidate_lifecycle() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let api = FakeStoreApi::new();
    let (manager, store) = manager_with(api.clone());
    let payload = br#"{"userInfo":{"name":"A","email":"a@x.com"}}"#;

    let session_id = manager.create_session(payload, 86400).await.unwrap();
    assert_eq!(
        store.get(slots::SESSION_ID).await.unwrap(),
        Some(session_id)
    );

    let share = manager.authorize_session(false).await.unwrap();
    assert_eq!(share.as_bytes(), payload);

    assert!(manager.invalidate_session().await.unwrap());
    assert_eq!(
        manager.authorize_session(false).await.unwrap_err(),
        SessionManagerError::SessionIdNotFound
    );

    // A second invalidate has nothing left to revoke.
    assert!(!manager.invalidate_session().await.unwrap());
}

#[tokio::test]
async fn test_session_survives_process_restart() {
    let api = FakeStoreApi::new();
    let store = InMemoryKeyValueStore::new();
    let payload = b"cached credential material";

    let manager = SessionManager::new(
        Arc::new(SoftwareCustodian::new()),
        Arc::new(store.clone()),
        api.clone(),
    );
    manager.create_session(payload, 3600).await.unwrap();
    drop(manager);

    // A new manager over the same slots picks the session up; the persisted
    // slots are the source of truth.
    let restarted = SessionManager::new(
        Arc::new(SoftwareCustodian::new()),
        Arc::new(store.clone()),
        api.clone(),
    );
    let share = restarted.authorize_session(false).await.unwrap();
    assert_eq!(share.as_bytes(), payload);
}

#[tokio::test]
async fn test_authorized_payload_envelope_normalization() {
    let api = FakeStoreApi::new();
    let (manager, _store) = manager_with(api.clone());

    // A legacy producer nests user data under "store".
    let payload = br#"{"store":{"email":"a@x.com"},"sessionTime":86400}"#;
    manager.create_session(payload, 86400).await.unwrap();

    let share = manager.authorize_session(false).await.unwrap();
    let envelope = AuthorizedPayload::parse(&share).unwrap().normalized();

    assert_eq!(envelope.user_info.unwrap()["email"], "a@x.com");
    assert!(envelope.store.is_none());
    assert_eq!(envelope.extra["sessionTime"], 86400);
}
