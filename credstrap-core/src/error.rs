//! Top-level error types for credstrap.

use thiserror::Error;

use crate::initiator::InitiatorError;
use crate::oauth::AuthError;
use crate::store::StoreError;

/// Top-level error type encompassing all credstrap errors.
#[derive(Debug, Error)]
pub enum CredstrapError {
    /// Error from token file operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error from an authorization flow or transport handle.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Error from the client registry.
    #[error("initiator error: {0}")]
    Initiator(#[from] InitiatorError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl CredstrapError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error stems from malformed or missing credential material.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::Auth(AuthError::Config { .. })
        )
    }
}
