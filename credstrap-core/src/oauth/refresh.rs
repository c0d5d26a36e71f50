//! Token source for delegated credentials.
//!
//! [`RefreshingTokenSource`] holds a previously obtained [`Token`] and, when
//! it is about to expire, renews it with the refresh value through the
//! client's token endpoint. Tokens without a refresh value are used until
//! they expire and then rejected.

use async_trait::async_trait;
use chrono::Duration;
use oauth2::{basic::BasicClient, reqwest::async_http_client, RefreshToken};
use tokio::sync::Mutex;

use super::{token_from_response, AuthError};
use crate::token::Token;
use crate::transport::TokenSource;

/// Tokens expiring within this window are renewed before use.
const EXPIRY_LEEWAY_SECONDS: i64 = 10;

/// Delegated token source with transparent refresh.
pub struct RefreshingTokenSource {
    client: BasicClient,
    current: Mutex<Token>,
}

impl RefreshingTokenSource {
    pub fn new(client: BasicClient, token: Token) -> Self {
        Self {
            client,
            current: Mutex::new(token),
        }
    }

    /// Snapshot of the cached token, without renewing it.
    pub async fn current(&self) -> Token {
        self.current.lock().await.clone()
    }

    async fn refresh(&self, token: &Token) -> Result<Token, AuthError> {
        let refresh_token = token.refresh_token.as_ref().ok_or_else(|| AuthError::Rejected {
            message: "access token expired and no refresh token is available".to_string(),
        })?;

        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.expose().to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::Rejected {
                message: format!("token refresh failed: {}", e),
            })?;

        let mut refreshed = token_from_response(&response, Some(refresh_token))?;
        if refreshed.scopes.is_empty() {
            refreshed.scopes = token.scopes.clone();
        }
        Ok(refreshed)
    }
}

#[async_trait]
impl TokenSource for RefreshingTokenSource {
    async fn token(&self) -> Result<Token, AuthError> {
        let mut current = self.current.lock().await;

        if !current.expires_within(Duration::seconds(EXPIRY_LEEWAY_SECONDS)) {
            return Ok(current.clone());
        }

        tracing::debug!("Delegated access token expired, refreshing");
        let refreshed = self.refresh(&current).await?;
        *current = refreshed.clone();
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClientSecretDefinition;
    use crate::oauth::create_oauth_client;
    use chrono::Utc;

    fn client() -> BasicClient {
        create_oauth_client(&ClientSecretDefinition::new("id", "secret")).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_token_returned_without_network() {
        let token = Token::new("fresh").with_expiry(Utc::now() + Duration::hours(1));
        let source = RefreshingTokenSource::new(client(), token.clone());

        assert_eq!(source.token().await.unwrap(), token);
    }

    #[tokio::test]
    async fn test_token_without_expiry_never_refreshes() {
        let source = RefreshingTokenSource::new(client(), Token::new("forever"));
        assert_eq!(source.token().await.unwrap().access_token.expose(), "forever");
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_is_rejected() {
        let token = Token::new("stale").with_expiry(Utc::now() - Duration::hours(1));
        let source = RefreshingTokenSource::new(client(), token);

        let result = source.token().await;
        assert!(matches!(result, Err(AuthError::Rejected { .. })));
        assert_eq!(source.current().await.access_token.expose(), "stale");
    }
}
