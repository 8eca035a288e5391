// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Key Custodian
//!
//! Capability interface over the session key pair: generate a fresh key,
//! derive the public point, sign request payloads and run ECDH. Keeping this
//! behind a trait lets the protocol run against a hardware-backed keystore
//! without touching the orchestration code; [`SoftwareCustodian`] is the
//! default secp256k1 implementation.
//!
//! ## Security Considerations
//!
//! - The private scalar hex doubles as the session id and must be treated as
//!   a secret, never logged
//! - Signing is RFC 6979 deterministic ECDSA over SHA-256 of the message
//! - ECDH goes through `k256::ecdh::diffie_hellman`, which is constant-time
//!   with respect to the scalar

use anyhow::{anyhow, Result};
use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature, SigningKey};
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{EncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;

/// A freshly generated session key pair.
///
/// `private_hex` is the 64-char hex scalar (this is the session id);
/// `public_hex` is the 130-char "04"-prefixed uncompressed point.
#[derive(Debug, Clone)]
pub struct SessionKey {
    pub private_hex: String,
    pub public_hex: String,
}

/// Capability to generate, sign and derive with the session key.
pub trait KeyCustodian: Send + Sync {
    /// Produce a fresh random key pair. Never reuses randomness across calls.
    fn generate_session_key(&self) -> Result<SessionKey>;

    /// Deterministic public point for a private scalar, "04"-prefixed
    /// uncompressed hex.
    fn public_key_hex(&self, private_hex: &str) -> Result<String>;

    /// Sign `message` with the private scalar.
    ///
    /// Returns `hex(r) || hex(s)`, 128 chars. The message is the exact
    /// serialized payload about to be transmitted.
    fn sign(&self, private_hex: &str, message: &[u8]) -> Result<String>;

    /// ECDH x-coordinate between a private scalar and a counterpart public
    /// point.
    fn shared_secret_x(&self, private_hex: &str, remote_public_hex: &str) -> Result<[u8; 32]>;
}

/// Software key custodian backed by secp256k1.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareCustodian;

impl SoftwareCustodian {
    pub fn new() -> Self {
        Self
    }
}

impl KeyCustodian for SoftwareCustodian {
    fn generate_session_key(&self) -> Result<SessionKey> {
        // Rejection-sample the scalar so a misbehaving entropy source maps
        // to an error instead of a panic. A valid scalar is found on the
        // first draw except with negligible probability.
        for _ in 0..4 {
            let mut candidate = [0u8; 32];
            OsRng
                .try_fill_bytes(&mut candidate)
                .map_err(|e| anyhow!("entropy source unavailable: {}", e))?;

            if let Ok(secret) = SecretKey::from_slice(&candidate) {
                return Ok(SessionKey {
                    private_hex: hex::encode(secret.to_bytes()),
                    public_hex: encode_public(&secret.public_key()),
                });
            }
        }
        Err(anyhow!("entropy source produced no valid scalar"))
    }

    fn public_key_hex(&self, private_hex: &str) -> Result<String> {
        let secret = parse_private(private_hex)?;
        Ok(encode_public(&secret.public_key()))
    }

    fn sign(&self, private_hex: &str, message: &[u8]) -> Result<String> {
        let secret = parse_private(private_hex)?;
        let signing_key = SigningKey::from(&secret);
        let signature: Signature = signing_key.sign(message);
        Ok(hex::encode(signature.to_bytes()))
    }

    fn shared_secret_x(&self, private_hex: &str, remote_public_hex: &str) -> Result<[u8; 32]> {
        let secret = parse_private(private_hex)?;
        let remote = parse_public(remote_public_hex)?;

        let shared =
            k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), remote.as_affine());

        let mut x = [0u8; 32];
        x.copy_from_slice(shared.raw_secret_bytes());
        Ok(x)
    }
}

/// Parse a hex private scalar.
///
/// Accepts an optional "0x" prefix and left-pads short strings with zeros,
/// matching big-integer semantics of ids minted by older producers.
fn parse_private(private_hex: &str) -> Result<SecretKey> {
    let trimmed = private_hex.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if trimmed.is_empty() || trimmed.len() > 64 {
        return Err(anyhow!(
            "Invalid private scalar length: expected at most 64 hex chars, got {}",
            trimmed.len()
        ));
    }

    let padded = format!("{:0>64}", trimmed);
    let bytes = hex::decode(&padded)
        .map_err(|e| anyhow!("Private scalar is not valid hex: {}", e))?;

    SecretKey::from_slice(&bytes).map_err(|e| anyhow!("Invalid private scalar: {}", e))
}

/// Parse a hex public point, compressed (33 bytes) or uncompressed (65 bytes).
fn parse_public(public_hex: &str) -> Result<PublicKey> {
    let bytes = hex::decode(public_hex.trim())
        .map_err(|e| anyhow!("Public key is not valid hex: {}", e))?;

    if bytes.len() != 33 && bytes.len() != 65 {
        return Err(anyhow!(
            "Invalid public key size: expected 33 or 65 bytes, got {}",
            bytes.len()
        ));
    }

    let point = EncodedPoint::from_bytes(&bytes)
        .map_err(|e| anyhow!("Failed to parse public key: {}", e))?;

    let public = PublicKey::from_encoded_point(&point);
    if public.is_some().into() {
        Ok(public.unwrap())
    } else {
        Err(anyhow!("Invalid public key point"))
    }
}

fn encode_public(public: &PublicKey) -> String {
    hex::encode(public.to_encoded_point(false).as_bytes())
}
