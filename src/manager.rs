// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session lifecycle orchestration.
//!
//! Drives the three protocol operations over the injected collaborators:
//!
//! - **create**: mint an ephemeral key pair, encrypt the payload under a key
//!   the scalar holder can rebuild alone, publish the signed share, persist
//!   the session id
//! - **authorize**: look up the share by the persisted id's public point,
//!   verify and decrypt it
//! - **invalidate**: republish an empty share with a one-second lifetime and
//!   drop the persisted id
//!
//! Session states move `NoSession -> Created -> Authorized -> NoSession`.
//! The manager holds no state between operations; the persisted slots are
//! the only durable copy. Operations are single-attempt and must not overlap
//! for the same session id; callers serialize.
//!
//! Every failure is mapped here, at the operation boundary, onto
//! [`SessionManagerError`]; errors from the crypto, codec and network layers
//! never leak raw.

use crate::api::{AlwaysReachable, ConnectivityProbe, SessionStoreApi};
use crate::codec;
use crate::crypto::{cipher, CipherKeys, KeyCustodian};
use crate::error::SessionManagerError;
use crate::storage::{slots, KeyValueStore};
use crate::types::{SessionRequestBody, ShareMetadata};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on the requested session lifetime: seven days.
pub const MAX_SESSION_TIMEOUT_SECS: u64 = 7 * 86400;

pub struct SessionManager {
    custodian: Arc<dyn KeyCustodian>,
    store: Arc<dyn KeyValueStore>,
    api: Arc<dyn SessionStoreApi>,
    connectivity: Arc<dyn ConnectivityProbe>,
}

impl SessionManager {
    pub fn new(
        custodian: Arc<dyn KeyCustodian>,
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn SessionStoreApi>,
    ) -> Self {
        Self {
            custodian,
            store,
            api,
            connectivity: Arc::new(AlwaysReachable),
        }
    }

    /// Replace the default always-online probe with a host-provided one.
    pub fn with_connectivity(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.connectivity = probe;
        self
    }

    /// Persist a session id handed over by the host, e.g. one restored from
    /// an earlier login on another surface. Empty input is ignored.
    pub async fn seed_session_id(&self, session_id: &str) -> Result<(), SessionManagerError> {
        if session_id.is_empty() {
            return Ok(());
        }
        self.store
            .set(slots::SESSION_ID, session_id)
            .await
            .map_err(|_| SessionManagerError::RuntimeError)
    }

    /// Create a session protecting `payload` for up to
    /// `requested_timeout_secs` seconds (clamped to seven days).
    ///
    /// Returns the new session id: the hex private scalar of the freshly
    /// generated key pair. Treat it as a secret.
    pub async fn create_session(
        &self,
        payload: &[u8],
        requested_timeout_secs: u64,
    ) -> Result<String, SessionManagerError> {
        self.ensure_reachable()?;

        let session_key = self
            .custodian
            .generate_session_key()
            .map_err(|_| SessionManagerError::KeyGenerationError)?;
        let iv = cipher::random_iv();

        // Derive against the key's own public point. Authorize later rebuilds
        // the same secret from the persisted scalar alone.
        let shared_x = self
            .custodian
            .shared_secret_x(&session_key.private_hex, &session_key.public_hex)
            .map_err(|_| SessionManagerError::RuntimeError)?;
        let keys = CipherKeys::derive(&shared_x);

        let ciphertext = cipher::encrypt(&keys.encryption, &iv, payload);
        let tag = cipher::mac(&keys.mac, &ciphertext);

        let metadata = ShareMetadata {
            iv: hex::encode(iv),
            ephem_public_key: session_key.public_hex.clone(),
            ciphertext: cipher::encode_ciphertext(&ciphertext),
            mac: hex::encode(tag),
        };
        let data = codec::encode(&metadata)?;
        let signature = self
            .custodian
            .sign(&session_key.private_hex, data.as_bytes())
            .map_err(|_| SessionManagerError::RuntimeError)?;

        let body = SessionRequestBody {
            key: session_key.public_hex.clone(),
            data,
            signature,
            timeout: requested_timeout_secs.min(MAX_SESSION_TIMEOUT_SECS),
        };

        debug!(timeout = body.timeout, "publishing session share");
        if let Err(e) = self.api.set(&body).await {
            warn!("session store set failed: {}", e);
            return Err(SessionManagerError::SomethingWentWrong);
        }

        self.store
            .set(slots::SESSION_ID, &session_key.private_hex)
            .await
            .map_err(|_| SessionManagerError::RuntimeError)?;

        info!("session created");
        Ok(session_key.private_hex)
    }

    /// Authorize the persisted session and return the decrypted payload.
    ///
    /// `from_login_flow` selects the ciphertext decode dialect of the
    /// producer that published the share (see
    /// [`cipher::decode_ciphertext`]).
    pub async fn authorize_session(
        &self,
        from_login_flow: bool,
    ) -> Result<String, SessionManagerError> {
        let session_id = self
            .read_session_id()
            .await?
            .ok_or(SessionManagerError::SessionIdNotFound)?;
        self.ensure_reachable()?;

        let public_key = self
            .custodian
            .public_key_hex(&session_id)
            .map_err(|_| SessionManagerError::RuntimeError)?;

        let response = match self.api.get(&public_key).await {
            Ok(response) => response,
            Err(e) => {
                warn!("session store get failed: {}", e);
                return Err(SessionManagerError::SessionExpired);
            }
        };
        let message = match response.message {
            Some(message) if !message.is_empty() => message,
            _ => return Err(SessionManagerError::SessionExpired),
        };

        self.open_share(&session_id, &message, from_login_flow)
            .await
            .map_err(|e| {
                debug!("failed to open retrieved share: {}", e);
                SessionManagerError::NoUserFound
            })
    }

    /// Invalidate the persisted session.
    ///
    /// Resolves `false` without touching the network when no session id is
    /// persisted; `true` after the store accepted the revocation and the id
    /// slot was deleted.
    pub async fn invalidate_session(&self) -> Result<bool, SessionManagerError> {
        let session_id = match self.read_session_id().await? {
            Some(id) => id,
            None => {
                debug!("no persisted session id, nothing to invalidate");
                return Ok(false);
            }
        };
        self.ensure_reachable()?;

        let cached_ephem = self
            .store
            .get(slots::EPHEM_PUBLIC_KEY)
            .await
            .map_err(|_| SessionManagerError::RuntimeError)?;
        let cached_iv = self
            .store
            .get(slots::IV)
            .await
            .map_err(|_| SessionManagerError::RuntimeError)?;

        // Reuse the share fields cached by the last authorize when present,
        // otherwise rebuild them from the session id itself.
        let ephem_public_key = match cached_ephem {
            Some(key) if !key.is_empty() => key,
            _ => self
                .custodian
                .public_key_hex(&session_id)
                .map_err(|_| SessionManagerError::RuntimeError)?,
        };
        let iv = match cached_iv.as_deref() {
            Some(iv_hex) if !iv_hex.is_empty() => {
                parse_iv(iv_hex).map_err(|_| SessionManagerError::RuntimeError)?
            }
            _ => cipher::random_iv(),
        };

        let shared_x = self
            .custodian
            .shared_secret_x(&session_id, &ephem_public_key)
            .map_err(|_| SessionManagerError::RuntimeError)?;
        let keys = CipherKeys::derive(&shared_x);

        let ciphertext = cipher::encrypt(&keys.encryption, &iv, b"");
        let tag = cipher::mac(&keys.mac, &ciphertext);

        let metadata = ShareMetadata {
            iv: hex::encode(iv),
            ephem_public_key,
            ciphertext: cipher::encode_ciphertext(&ciphertext),
            mac: hex::encode(tag),
        };
        let data = codec::encode(&metadata)?;
        let signature = self
            .custodian
            .sign(&session_id, data.as_bytes())
            .map_err(|_| SessionManagerError::RuntimeError)?;
        let key = self
            .custodian
            .public_key_hex(&session_id)
            .map_err(|_| SessionManagerError::RuntimeError)?;

        let body = SessionRequestBody {
            key,
            data,
            signature,
            timeout: 1,
        };

        if let Err(e) = self.api.set(&body).await {
            warn!("session store set failed: {}", e);
            return Err(SessionManagerError::SomethingWentWrong);
        }

        self.store
            .delete(slots::SESSION_ID)
            .await
            .map_err(|_| SessionManagerError::RuntimeError)?;

        info!("session invalidated");
        Ok(true)
    }

    /// Decode, verify and decrypt a retrieved share. Any failure here maps
    /// to `NoUserFound` at the authorize boundary.
    async fn open_share(
        &self,
        session_id: &str,
        message: &str,
        from_login_flow: bool,
    ) -> Result<String> {
        let metadata = codec::decode(message)?;

        // Cache the retrieved fields; invalidate reuses them opportunistically.
        self.store
            .set(slots::EPHEM_PUBLIC_KEY, &metadata.ephem_public_key)
            .await?;
        self.store.set(slots::IV, &metadata.iv).await?;
        self.store.set(slots::MAC, &metadata.mac).await?;

        let shared_x = self
            .custodian
            .shared_secret_x(session_id, &metadata.ephem_public_key)?;
        let keys = CipherKeys::derive(&shared_x);

        let ciphertext = cipher::decode_ciphertext(&metadata.ciphertext, from_login_flow)?;
        let expected_tag = hex::decode(&metadata.mac)
            .map_err(|e| anyhow!("MAC is not valid hex: {}", e))?;
        cipher::verify_mac(&keys.mac, &ciphertext, &expected_tag)?;

        let iv = parse_iv(&metadata.iv)?;
        let plaintext = cipher::decrypt(&keys.encryption, &iv, &ciphertext)?;

        String::from_utf8(plaintext)
            .map_err(|e| anyhow!("Decrypted share is not valid UTF-8: {}", e))
    }

    async fn read_session_id(&self) -> Result<Option<String>, SessionManagerError> {
        let session_id = self
            .store
            .get(slots::SESSION_ID)
            .await
            .map_err(|_| SessionManagerError::RuntimeError)?;
        Ok(session_id.filter(|id| !id.is_empty()))
    }

    fn ensure_reachable(&self) -> Result<(), SessionManagerError> {
        if self.connectivity.is_reachable() {
            Ok(())
        } else {
            Err(SessionManagerError::RuntimeError)
        }
    }
}

fn parse_iv(iv_hex: &str) -> Result<[u8; cipher::IV_LEN]> {
    let bytes = hex::decode(iv_hex).map_err(|e| anyhow!("IV is not valid hex: {}", e))?;
    if bytes.len() != cipher::IV_LEN {
        return Err(anyhow!(
            "Invalid IV size: expected {} bytes, got {}",
            cipher::IV_LEN,
            bytes.len()
        ));
    }
    let mut iv = [0u8; cipher::IV_LEN];
    iv.copy_from_slice(&bytes);
    Ok(iv)
}
