//! Encryption envelope for token files at rest.
//!
//! Layout on disk is a small JSON document:
//!
//! ```json
//! {"version":1,"salt":"...","nonce":"...","ciphertext":"..."}
//! ```
//!
//! The AES-256-GCM key is derived from the passphrase with Argon2id and the
//! per-file salt. Binary fields are standard base64.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use super::Secret;

const ENVELOPE_VERSION: u32 = 1;
const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const PASSPHRASE_LEN: usize = 32;

/// Error raised while sealing or opening an envelope.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EnvelopeError(String);

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    salt: String,
    nonce: String,
    ciphertext: String,
}

/// Generate a random alphanumeric passphrase.
pub fn generate_passphrase() -> Secret {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();

    let value: String = (0..PASSPHRASE_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    Secret::new(value)
}

fn derive_key(passphrase: &Secret, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, EnvelopeError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    Argon2::default()
        .hash_password_into(passphrase.expose().as_bytes(), salt, &mut key[..])
        .map_err(|e| EnvelopeError(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

/// Encrypt `plaintext` under `passphrase` and return the envelope bytes.
pub(crate) fn seal(plaintext: &[u8], passphrase: &Secret) -> Result<Vec<u8>, EnvelopeError> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| EnvelopeError(format!("invalid key: {}", e)))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| EnvelopeError(format!("encryption failed: {}", e)))?;

    let envelope = Envelope {
        version: ENVELOPE_VERSION,
        salt: STANDARD.encode(salt),
        nonce: STANDARD.encode(nonce_bytes),
        ciphertext: STANDARD.encode(ciphertext),
    };
    serde_json::to_vec(&envelope).map_err(|e| EnvelopeError(format!("failed to encode envelope: {}", e)))
}

/// Decrypt envelope bytes produced by [`seal`].
pub(crate) fn open(bytes: &[u8], passphrase: &Secret) -> Result<Vec<u8>, EnvelopeError> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| EnvelopeError(format!("not an encrypted token file: {}", e)))?;

    if envelope.version != ENVELOPE_VERSION {
        return Err(EnvelopeError(format!(
            "unsupported envelope version {}",
            envelope.version
        )));
    }

    let decode = |field: &str, value: &str| {
        STANDARD
            .decode(value)
            .map_err(|e| EnvelopeError(format!("invalid {}: {}", field, e)))
    };
    let salt = decode("salt", &envelope.salt)?;
    let nonce_bytes = decode("nonce", &envelope.nonce)?;
    let ciphertext = decode("ciphertext", &envelope.ciphertext)?;

    if nonce_bytes.len() != NONCE_LEN {
        return Err(EnvelopeError("invalid nonce length".to_string()));
    }

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| EnvelopeError(format!("invalid key: {}", e)))?;
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| EnvelopeError("wrong passphrase or corrupted file".to_string()))
}
