//! AES-256-CBC Encryption with HMAC Authentication
//!
//! Implements the symmetric half of the session protocol: both peers derive
//! identical key material from the ECDH shared x-coordinate, encrypt with
//! AES-256 in CBC mode (PKCS#7 padding) and authenticate the ciphertext with
//! HMAC-SHA256.
//!
//! ## Key Derivation Contract
//!
//! The split is fixed and must never change, since both peers derive it
//! independently:
//!
//! ```text
//! digest = SHA-512(shared_x)
//! encryption_key = digest[0..32]
//! mac_key        = digest[32..64]
//! ```
//!
//! ## Ciphertext Decode Paths
//!
//! Two producer backends disagree on the ciphertext text encoding. The login
//! backend publishes a hex-encoded big integer (leading zeros may be dropped,
//! the length may be odd); everything else uses base64. The `from_login_flow`
//! flag in [`decode_ciphertext`] selects between them. This inconsistency is
//! inherited wire behavior, not something to unify here.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// CBC initialization vector length in bytes (32 hex chars on the wire).
pub const IV_LEN: usize = 16;

/// Symmetric key material derived from an ECDH shared secret.
pub struct CipherKeys {
    pub encryption: [u8; 32],
    pub mac: [u8; 32],
}

impl CipherKeys {
    /// Derive the encryption and MAC keys from the shared x-coordinate.
    pub fn derive(shared_x: &[u8; 32]) -> Self {
        let digest = Sha512::digest(shared_x);

        let mut encryption = [0u8; 32];
        let mut mac = [0u8; 32];
        encryption.copy_from_slice(&digest[..32]);
        mac.copy_from_slice(&digest[32..]);

        Self { encryption, mac }
    }
}

/// Fresh random IV, one per encrypt operation. Not secret, transmitted in
/// clear alongside the ciphertext.
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// AES-256-CBC encrypt with PKCS#7 padding.
pub fn encrypt(key: &[u8; 32], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// AES-256-CBC decrypt.
///
/// # Errors
///
/// Fails on length violations or bad PKCS#7 padding, which with CBC also
/// covers most wrong-key cases.
pub fn decrypt(key: &[u8; 32], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
    Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| anyhow!("CBC decryption failed: {}", e))
}

/// HMAC-SHA256 tag over the raw ciphertext bytes.
pub fn mac(mac_key: &[u8; 32], ciphertext: &[u8]) -> [u8; 32] {
    let mut hmac = HmacSha256::new_from_slice(mac_key)
        .expect("HMAC accepts any key length");
    hmac.update(ciphertext);
    hmac.finalize().into_bytes().into()
}

/// Constant-time verification of a ciphertext tag.
pub fn verify_mac(mac_key: &[u8; 32], ciphertext: &[u8], expected: &[u8]) -> Result<()> {
    let mut hmac = HmacSha256::new_from_slice(mac_key)
        .expect("HMAC accepts any key length");
    hmac.update(ciphertext);
    hmac.verify_slice(expected)
        .map_err(|_| anyhow!("MAC verification failed: ciphertext was altered"))
}

/// Text encoding applied to ciphertext this crate produces.
pub fn encode_ciphertext(ciphertext: &[u8]) -> String {
    BASE64.encode(ciphertext)
}

/// Recover raw ciphertext bytes from its wire text form.
///
/// `from_login_flow` selects the producer dialect:
/// - `true`: hex big integer. Odd lengths are normalized with a leading
///   zero nibble before decoding.
/// - `false`: plain base64, the inverse of [`encode_ciphertext`].
pub fn decode_ciphertext(text: &str, from_login_flow: bool) -> Result<Vec<u8>> {
    if from_login_flow {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Ciphertext is empty"));
        }
        let normalized = if trimmed.len() % 2 == 1 {
            format!("0{}", trimmed)
        } else {
            trimmed.to_string()
        };
        hex::decode(&normalized).map_err(|e| anyhow!("Ciphertext is not valid hex: {}", e))
    } else {
        BASE64
            .decode(text.trim())
            .map_err(|e| anyhow!("Ciphertext is not valid base64: {}", e))
    }
}
