// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Share record JSON codec.
//!
//! The encoded string is itself the message that gets signed and transmitted
//! in `SessionRequestBody.data`, so encoding must be byte-stable: field order
//! follows the struct declaration and no HTML escaping is applied (serde_json
//! escapes only what JSON requires). Decoding accepts any field order and
//! ignores unknown fields.

use crate::error::SessionManagerError;
use crate::types::ShareMetadata;

/// Serialize a share record to its canonical wire form.
pub fn encode(metadata: &ShareMetadata) -> Result<String, SessionManagerError> {
    serde_json::to_string(metadata).map_err(|_| SessionManagerError::EncodingError)
}

/// Parse a share record received from the store.
pub fn decode(raw: &str) -> Result<ShareMetadata, SessionManagerError> {
    serde_json::from_str(raw).map_err(|_| SessionManagerError::DecodingError)
}
