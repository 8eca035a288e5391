// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Protocol Cryptography
//!
//! This module implements the cryptographic primitives behind the encrypted
//! session protocol:
//!
//! - **Custodian**: secp256k1 key generation, ECDSA signing and ECDH behind
//!   a capability trait
//! - **Cipher**: AES-256-CBC encryption with an HMAC-SHA256 ciphertext tag,
//!   plus the documented shared-secret key split
//!
//! ## Protocol Flow
//!
//! 1. Create generates an ephemeral key pair; the private scalar hex becomes
//!    the session id
//! 2. The symmetric keys are derived from ECDH between the key and its own
//!    public point, so the holder of the scalar can rebuild them alone
//! 3. The payload is encrypted, tagged and published together with the IV
//!    and ephemeral public key, signed by the session key itself
//! 4. Authorize rederives the keys from the persisted scalar, verifies the
//!    tag and decrypts

pub mod cipher;
pub mod custodian;

pub use cipher::{CipherKeys, IV_LEN};
pub use custodian::{KeyCustodian, SessionKey, SoftwareCustodian};
