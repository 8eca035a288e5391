//! Authorize-session behavior: round trip, both ciphertext dialects, MAC
//! rejection, slot caching, failure mapping.

use super::support::{manager_with, offline_manager_with, FakeStoreApi};
use session_vault::crypto::{cipher, CipherKeys, KeyCustodian, SoftwareCustodian};
use session_vault::{slots, KeyValueStore, SessionManagerError, ShareMetadata};
use std::sync::atomic::Ordering;

const PAYLOAD: &[u8] = br#"{"name":"A","email":"a@x.com"}"#;

#[tokio::test]
async fn test_authorize_without_session_id_skips_network() {
    let api = FakeStoreApi::new();
    let (manager, _store) = manager_with(api.clone());

    let result = manager.authorize_session(false).await;

    assert_eq!(result.unwrap_err(), SessionManagerError::SessionIdNotFound);
    assert_eq!(api.network_calls(), 0);
}

#[tokio::test]
async fn test_authorize_offline_is_runtime_error_without_network() {
    let api = FakeStoreApi::new();
    let (manager, _store) = offline_manager_with(api.clone());
    manager.seed_session_id(&"11".repeat(32)).await.unwrap();

    let result = manager.authorize_session(false).await;

    assert_eq!(result.unwrap_err(), SessionManagerError::RuntimeError);
    assert_eq!(api.network_calls(), 0);
}

#[tokio::test]
async fn test_authorize_remote_miss_is_session_expired() {
    let api = FakeStoreApi::new();
    let (manager, _store) = manager_with(api.clone());
    manager.seed_session_id(&"11".repeat(32)).await.unwrap();

    // Nothing published under this key: the store answers with no message.
    let result = manager.authorize_session(false).await;

    assert_eq!(result.unwrap_err(), SessionManagerError::SessionExpired);
    assert_eq!(api.network_calls(), 1);
}

#[tokio::test]
async fn test_authorize_remote_error_is_session_expired() {
    let api = FakeStoreApi::new();
    api.fail_get.store(true, Ordering::SeqCst);
    let (manager, _store) = manager_with(api.clone());
    manager.seed_session_id(&"11".repeat(32)).await.unwrap();

    let result = manager.authorize_session(false).await;

    assert_eq!(result.unwrap_err(), SessionManagerError::SessionExpired);
}

#[tokio::test]
async fn test_authorize_round_trips_created_session() {
    let api = FakeStoreApi::new();
    let (manager, store) = manager_with(api.clone());

    manager.create_session(PAYLOAD, 86400).await.unwrap();
    let share = manager.authorize_session(false).await.unwrap();

    assert_eq!(share.as_bytes(), PAYLOAD);

    // The retrieved share fields are cached for a later invalidate.
    let published: ShareMetadata =
        serde_json::from_str(&api.last_set().await.data).unwrap();
    assert_eq!(
        store.get(slots::EPHEM_PUBLIC_KEY).await.unwrap(),
        Some(published.ephem_public_key)
    );
    assert_eq!(store.get(slots::IV).await.unwrap(), Some(published.iv));
    assert_eq!(store.get(slots::MAC).await.unwrap(), Some(published.mac));
}

#[tokio::test]
async fn test_authorize_rejects_tampered_ciphertext() {
    let api = FakeStoreApi::new();
    let (manager, _store) = manager_with(api.clone());

    manager.create_session(PAYLOAD, 86400).await.unwrap();
    let key = api.last_set().await.key;

    // Flip one ciphertext byte, keep the published MAC.
    api.patch_record(&key, |message| {
        let mut metadata: ShareMetadata = serde_json::from_str(&message).unwrap();
        let mut raw = cipher::decode_ciphertext(&metadata.ciphertext, false).unwrap();
        raw[0] ^= 0x01;
        metadata.ciphertext = cipher::encode_ciphertext(&raw);
        serde_json::to_string(&metadata).unwrap()
    })
    .await;

    let result = manager.authorize_session(false).await;

    assert_eq!(result.unwrap_err(), SessionManagerError::NoUserFound);
}

#[tokio::test]
async fn test_authorize_garbled_share_is_no_user_found() {
    let api = FakeStoreApi::new();
    let (manager, _store) = manager_with(api.clone());

    manager.create_session(PAYLOAD, 86400).await.unwrap();
    let key = api.last_set().await.key;
    api.put_record(&key, "not a share record").await;

    let result = manager.authorize_session(false).await;

    assert_eq!(result.unwrap_err(), SessionManagerError::NoUserFound);
}

#[tokio::test]
async fn test_authorize_login_flow_decodes_hex_ciphertext() {
    let api = FakeStoreApi::new();
    let (manager, _store) = manager_with(api.clone());

    // Publish a share the way the login backend does: ciphertext rendered
    // as a hex big integer instead of base64.
    let custodian = SoftwareCustodian::new();
    let session_key = custodian.generate_session_key().unwrap();
    manager.seed_session_id(&session_key.private_hex).await.unwrap();

    let shared_x = custodian
        .shared_secret_x(&session_key.private_hex, &session_key.public_hex)
        .unwrap();
    let keys = CipherKeys::derive(&shared_x);
    let iv = cipher::random_iv();
    let ciphertext = cipher::encrypt(&keys.encryption, &iv, PAYLOAD);
    let tag = cipher::mac(&keys.mac, &ciphertext);

    let metadata = ShareMetadata {
        iv: hex::encode(iv),
        ephem_public_key: session_key.public_hex.clone(),
        ciphertext: hex::encode(&ciphertext),
        mac: hex::encode(tag),
    };
    api.put_record(
        &session_key.public_hex,
        &serde_json::to_string(&metadata).unwrap(),
    )
    .await;

    let share = manager.authorize_session(true).await.unwrap();
    assert_eq!(share.as_bytes(), PAYLOAD);

    // The same record does not decode on the base64 path.
    let result = manager.authorize_session(false).await;
    assert_eq!(result.unwrap_err(), SessionManagerError::NoUserFound);
}
