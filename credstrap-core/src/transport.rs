//! Authenticated transport handles.
//!
//! A [`TransportHandle`] is an HTTP client bound to exactly one credential
//! source. The source hands out a currently valid [`Token`], renewing it on
//! demand; construction never talks to a server.

use async_trait::async_trait;
use reqwest::{IntoUrl, Method, RequestBuilder, Response};
use std::fmt;
use std::sync::Arc;

use crate::model::CredentialKind;
use crate::oauth::AuthError;
use crate::scope::ScopeSet;
use crate::token::Token;

/// Produces a valid access token for a transport handle.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a token that is valid right now, renewing it if necessary.
    async fn token(&self) -> Result<Token, AuthError>;
}

/// An HTTP client bound to one credential.
///
/// Clones share the credential binding (and its cached token). To use a
/// different credential, build a new handle.
#[derive(Clone)]
pub struct TransportHandle {
    http: reqwest::Client,
    source: Arc<dyn TokenSource>,
    kind: CredentialKind,
    scopes: ScopeSet,
}

impl TransportHandle {
    /// Bind `source` to a fresh HTTP client.
    pub fn new(kind: CredentialKind, scopes: ScopeSet, source: impl TokenSource + 'static) -> Self {
        Self::with_http_client(reqwest::Client::new(), kind, scopes, source)
    }

    /// Bind `source` to an existing HTTP client.
    pub fn with_http_client(
        http: reqwest::Client,
        kind: CredentialKind,
        scopes: ScopeSet,
        source: impl TokenSource + 'static,
    ) -> Self {
        Self {
            http,
            source: Arc::new(source),
            kind,
            scopes,
        }
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// Scopes this handle was built for.
    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    /// The underlying client, without credentials attached.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Current access token, renewed if it has expired.
    pub async fn access_token(&self) -> Result<Token, AuthError> {
        self.source.token().await
    }

    /// Start a request with the `Authorization` header already set.
    pub async fn request(&self, method: Method, url: impl IntoUrl) -> Result<RequestBuilder, AuthError> {
        let token = self.access_token().await?;
        Ok(self
            .http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, token.authorization_header()))
    }

    /// Send an authenticated GET.
    pub async fn get(&self, url: impl IntoUrl) -> Result<Response, AuthError> {
        self.request(Method::GET, url)
            .await?
            .send()
            .await
            .map_err(|e| AuthError::Network {
                message: format!("request failed: {}", e),
            })
    }

    /// Whether two handles share the same credential binding.
    pub fn same_binding(&self, other: &TransportHandle) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("kind", &self.kind)
            .field("scopes", &self.scopes.len())
            .finish()
    }
}
