//! Token file storage.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`TokenStore`] - Persists and loads [`Token`]s, optionally encrypted at rest
//! - [`generate_passphrase`] - Random passphrase for encrypted token files
//!
//! # Atomic Writes
//!
//! Every write goes to a scratch file in the destination directory (random
//! name, owner-only permissions) and is renamed over the destination once it
//! is complete. The destination is therefore either fully replaced or left
//! as it was. The scratch file is removed on every failure path.
//!
//! # Example
//!
//! ```rust,no_run
//! use credstrap_core::{Token, TokenStore};
//!
//! # fn example() -> Result<(), credstrap_core::StoreError> {
//! let store = TokenStore::new();
//! let token = Token::new("ya29.access").with_refresh_token("1//refresh");
//!
//! store.persist(&token, "token.json", false)?;
//! let loaded = store.load("token.json")?;
//! assert_eq!(loaded, token);
//!
//! // Encrypted: keep the returned passphrase, it is the only way back in.
//! let passphrase = store.persist(&token, "token.enc", true)?.unwrap();
//! let loaded = store.load_encrypted("token.enc", &passphrase)?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec::{self, CodecError};
use crate::token::Token;

mod envelope;

pub use envelope::{generate_passphrase, EnvelopeError};

const SCRATCH_PREFIX: &str = ".credstrap-";
const SCRATCH_SUFFIX: &str = ".tmp";

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value.
/// The buffer is wiped when the secret is dropped.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consume the secret and return the inner value.
    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Error type for token store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No token file exists at the path.
    #[error("token file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but is not a token.
    #[error("failed to decode token file {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// Writing the token failed; the destination was not modified.
    #[error("failed to persist token to {}: {message}", path.display())]
    Persist { path: PathBuf, message: String },

    /// The encrypted file could not be opened.
    #[error("failed to decrypt {}: {source}", path.display())]
    Decrypt {
        path: PathBuf,
        #[source]
        source: EnvelopeError,
    },

    /// Reading the file failed for a reason other than absence.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads and writes token files.
///
/// A store may carry a passphrase used for encrypted writes. Without one,
/// each encrypted [`persist`](TokenStore::persist) generates a fresh
/// passphrase and hands it back to the caller.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    passphrase: Option<Secret>,
}

impl TokenStore {
    /// Create a store that generates a passphrase per encrypted write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that encrypts with a caller-supplied passphrase.
    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Some(Secret::new(passphrase)),
        }
    }

    /// Write `token` to `destination`.
    ///
    /// With `encrypt`, the bytes on disk are an encryption envelope and the
    /// passphrase used is returned; otherwise returns `Ok(None)`.
    pub fn persist(
        &self,
        token: &Token,
        destination: impl AsRef<Path>,
        encrypt: bool,
    ) -> Result<Option<Secret>, StoreError> {
        let destination = destination.as_ref();
        let persist_error = |message: String| StoreError::Persist {
            path: destination.to_path_buf(),
            message,
        };

        let encoded = codec::encode(token).map_err(|e| persist_error(e.to_string()))?;

        let (bytes, passphrase) = if encrypt {
            let passphrase = self.passphrase.clone().unwrap_or_else(generate_passphrase);
            let sealed = envelope::seal(&encoded, &passphrase)
                .map_err(|e| persist_error(format!("encryption failed: {}", e)))?;
            (sealed, Some(passphrase))
        } else {
            (encoded, None)
        };

        write_atomically(destination, &bytes).map_err(persist_error)?;

        tracing::debug!(
            path = %destination.display(),
            encrypted = encrypt,
            "Persisted token file"
        );
        Ok(passphrase)
    }

    /// Load a plaintext token file.
    pub fn load(&self, source: impl AsRef<Path>) -> Result<Token, StoreError> {
        let source = source.as_ref();
        let bytes = read_file(source)?;
        decode_at(source, &bytes)
    }

    /// Load a token file written with `encrypt = true`.
    pub fn load_encrypted(
        &self,
        source: impl AsRef<Path>,
        passphrase: &Secret,
    ) -> Result<Token, StoreError> {
        let source = source.as_ref();
        let bytes = self.decrypt_file(source, passphrase)?;
        decode_at(source, &bytes)
    }

    /// Decrypt an encrypted token file and return the raw token bytes.
    pub fn decrypt_file(
        &self,
        source: impl AsRef<Path>,
        passphrase: &Secret,
    ) -> Result<Vec<u8>, StoreError> {
        let source = source.as_ref();
        let bytes = read_file(source)?;
        envelope::open(&bytes, passphrase).map_err(|source_err| StoreError::Decrypt {
            path: source.to_path_buf(),
            source: source_err,
        })
    }

    /// The passphrase configured for encrypted writes, if any.
    pub fn passphrase(&self) -> Option<&Secret> {
        self.passphrase.as_ref()
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, StoreError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound {
            path: path.to_path_buf(),
        },
        _ => StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

fn decode_at(path: &Path, bytes: &[u8]) -> Result<Token, StoreError> {
    let token = codec::decode(bytes).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Loaded token file");
    Ok(token)
}

/// Write `bytes` to a scratch file beside `destination`, then rename it over
/// `destination`. The scratch file is deleted when any step fails.
fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<(), String> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(SCRATCH_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| format!("failed to create scratch file in {}: {}", dir.display(), e))?;

    scratch
        .write_all(bytes)
        .map_err(|e| format!("failed to write scratch file: {}", e))?;
    scratch
        .as_file()
        .sync_all()
        .map_err(|e| format!("failed to flush scratch file: {}", e))?;

    scratch
        .persist(destination)
        .map_err(|e| format!("failed to move scratch file into place: {}", e.error))?;
    Ok(())
}
