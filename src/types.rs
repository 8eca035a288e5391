// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wire types exchanged with the remote session store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Encrypted share record, published on create/invalidate and returned by
/// the store on authorize.
///
/// All fields are text encodings:
/// - `iv`: 16 random bytes as 32 hex chars, transmitted in clear
/// - `ephem_public_key`: "04"-prefixed uncompressed secp256k1 point,
///   130 hex chars
/// - `ciphertext`: base64 of the AES-256-CBC output on the path this crate
///   produces; a legacy producer publishes a hex big integer instead (see
///   [`crate::crypto::cipher::decode_ciphertext`])
/// - `mac`: HMAC-SHA256 over the raw ciphertext bytes, 64 hex chars
///
/// Serialization field order is the struct declaration order and must stay
/// stable: the encoded JSON string is what gets signed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareMetadata {
    pub iv: String,
    #[serde(rename = "ephemPublicKey")]
    pub ephem_public_key: String,
    pub ciphertext: String,
    pub mac: String,
}

/// Body of `POST /store/set`.
///
/// `key` is always the public counterpart of the signing key, never the
/// private scalar. `signature` covers the exact `data` string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequestBody {
    pub key: String,
    pub data: String,
    pub signature: String,
    /// Requested lifetime hint in seconds, enforced remotely.
    pub timeout: u64,
}

/// Body of a successful `GET /store/get` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreApiResponse {
    /// JSON-encoded [`ShareMetadata`], absent when the store has nothing
    /// under the requested key.
    #[serde(default)]
    pub message: Option<String>,
}

/// Typed envelope for the decrypted share payload.
///
/// Producers disagree on where user data lives: newer ones write `userInfo`,
/// one legacy backend nests it under `store`. [`AuthorizedPayload::normalized`]
/// promotes the legacy field so consumers only ever look at `user_info`.
/// Unrecognized fields are retained in `extra` untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizedPayload {
    #[serde(rename = "userInfo", skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Value>,
    #[serde(rename = "store", skip_serializing_if = "Option::is_none")]
    pub store: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthorizedPayload {
    /// Parse a decrypted share plaintext.
    pub fn parse(plaintext: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(plaintext)
    }

    /// Promote a legacy nested `store` object to `user_info`.
    ///
    /// A populated `user_info` always wins; `store` is only consulted when
    /// `user_info` is absent.
    pub fn normalized(mut self) -> Self {
        if self.user_info.is_none() {
            self.user_info = self.store.take();
        }
        self
    }
}
