//! Credential client factory.
//!
//! Turns a previously obtained delegated [`Token`] into a
//! [`TransportHandle`]. Every call builds an independent handle; nothing is
//! installed into a [`ClientRegistry`](crate::initiator::ClientRegistry)
//! unless the caller does so explicitly.

use std::path::Path;

use crate::error::CredstrapError;
use crate::model::{ClientSecretDefinition, CredentialKind};
use crate::oauth::{create_oauth_client, refresh::RefreshingTokenSource, AuthError};
use crate::scope::ScopeSet;
use crate::store::{Secret, TokenStore};
use crate::token::Token;
use crate::transport::TransportHandle;

/// Bind `token` to a new transport handle.
///
/// `client_secret` is the client registration the token was issued to; it
/// is needed to refresh the token once it expires.
pub fn from_token(
    client_secret: &[u8],
    token: Token,
    scopes: &ScopeSet,
) -> Result<TransportHandle, AuthError> {
    let definition = ClientSecretDefinition::from_json(client_secret)?;
    let client = create_oauth_client(&definition)?;

    if token.is_expired() && !token.is_refreshable() {
        tracing::warn!("Building a client from an expired token with no refresh value");
    }

    Ok(TransportHandle::new(
        CredentialKind::Delegated,
        scopes.clone(),
        RefreshingTokenSource::new(client, token),
    ))
}

/// Load a plaintext token file and bind it to a new transport handle.
pub fn from_stored_token(
    client_secret: &[u8],
    token_path: impl AsRef<Path>,
    scopes: &ScopeSet,
) -> Result<TransportHandle, CredstrapError> {
    let token = TokenStore::new().load(token_path)?;
    Ok(from_token(client_secret, token, scopes)?)
}

/// Load an encrypted token file and bind it to a new transport handle.
pub fn from_encrypted_token(
    client_secret: &[u8],
    token_path: impl AsRef<Path>,
    passphrase: &Secret,
    scopes: &ScopeSet,
) -> Result<TransportHandle, CredstrapError> {
    let token = TokenStore::new().load_encrypted(token_path, passphrase)?;
    Ok(from_token(client_secret, token, scopes)?)
}
