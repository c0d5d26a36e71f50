//! Authorization flows.
//!
//! This module provides:
//! - [`interactive`] - Delegated authorization-code flow with out-of-band code entry
//! - [`assertion`] - Signed-assertion (JWT bearer) flow for service identities
//! - [`refresh`] - Token source that renews delegated tokens on demand
//!
//! Shared helpers turn a [`ClientSecretDefinition`] into an `oauth2` client
//! and a token endpoint response into a [`Token`].

pub mod assertion;
pub mod interactive;
pub mod refresh;

use oauth2::{
    basic::{BasicClient, BasicTokenResponse, BasicTokenType},
    AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenResponse, TokenUrl,
};
use thiserror::Error;

use crate::model::ClientSecretDefinition;
use crate::store::Secret;
use crate::token::{Token, expiry_after};

/// Error type for authorization and transport operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential source material is malformed or missing.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The authorization server refused to exchange a code.
    #[error("code exchange failed: {message}")]
    Exchange { message: String },

    /// The credential was rejected when first used or refreshed.
    #[error("credential rejected: {message}")]
    Rejected { message: String },

    /// The server could not be reached.
    #[error("network error: {message}")]
    Network { message: String },

    /// The server answered with an unexpected status or body.
    #[error("unexpected response ({status}): {message}")]
    Http { status: u16, message: String },
}

/// Create an OAuth2 client from a client secret definition.
///
/// The first registered redirect URI is used; out-of-band entry is assumed
/// when none is registered.
pub fn create_oauth_client(definition: &ClientSecretDefinition) -> Result<BasicClient, AuthError> {
    let auth_url = AuthUrl::new(definition.auth_uri.clone()).map_err(|e| AuthError::Config {
        message: format!("invalid auth URL: {}", e),
    })?;

    let token_url = TokenUrl::new(definition.token_uri.clone()).map_err(|e| AuthError::Config {
        message: format!("invalid token URL: {}", e),
    })?;

    let redirect_url =
        RedirectUrl::new(definition.redirect_uri().to_string()).map_err(|e| AuthError::Config {
            message: format!("invalid redirect URL: {}", e),
        })?;

    let client = BasicClient::new(
        ClientId::new(definition.client_id.clone()),
        definition
            .client_secret
            .as_ref()
            .map(|s| ClientSecret::new(s.expose().to_string())),
        auth_url,
        Some(token_url),
    )
    .set_redirect_uri(redirect_url);

    Ok(client)
}

/// Convert a token endpoint response into a [`Token`].
///
/// `previous_refresh` is kept when the response carries no new refresh
/// value, which is the norm for refresh grants.
pub(crate) fn token_from_response(
    response: &BasicTokenResponse,
    previous_refresh: Option<&Secret>,
) -> Result<Token, AuthError> {
    let token_type = match response.token_type() {
        BasicTokenType::Bearer => "Bearer".to_string(),
        BasicTokenType::Mac => "MAC".to_string(),
        BasicTokenType::Extension(other) => other.clone(),
    };

    let scopes = response
        .scopes()
        .map(|s| s.iter().map(|scope| scope.to_string()).collect())
        .unwrap_or_default();

    let mut token = Token::new(response.access_token().secret().to_string())
        .with_token_type(token_type)
        .with_scopes(scopes);

    if let Some(duration) = response.expires_in() {
        let expiry = i64::try_from(duration.as_secs())
            .ok()
            .and_then(expiry_after)
            .ok_or_else(|| AuthError::Exchange {
                message: format!("expires_in out of range: {}s", duration.as_secs()),
            })?;
        token = token.with_expiry(expiry);
    }

    token.refresh_token = response
        .refresh_token()
        .map(|r| Secret::new(r.secret().to_string()))
        .or_else(|| previous_refresh.cloned());

    Ok(token)
}
