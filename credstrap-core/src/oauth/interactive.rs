//! Delegated authorization-code flow with out-of-band code entry.
//!
//! # Flow Overview
//!
//! 1. [`InteractiveAuthorizer::begin`] parses the client secret definition and
//!    builds an authorization URL for the requested scopes
//! 2. The operator opens the URL, grants consent and copies the code
//! 3. [`InteractiveAuthorizer::complete`] exchanges the code for a [`Token`]
//!
//! Step 2 is delegated to a [`CodePrompt`], so the same authorizer works from
//! a terminal, a GUI or a test.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use credstrap_core::oauth::interactive::{ConsolePrompt, InteractiveAuthorizer};
//! use credstrap_core::ScopeSet;
//!
//! let client_secret = std::fs::read("client_secret.json")?;
//! let scopes: ScopeSet = ["https://www.googleapis.com/auth/drive"].into_iter().collect();
//!
//! let mut authorizer = InteractiveAuthorizer::new();
//! let token = authorizer
//!     .authorize(&client_secret, &scopes, &ConsolePrompt)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthorizationCode, CsrfToken, Scope,
};
use std::io::{self, BufRead, Write};
use url::Url;

use super::{create_oauth_client, token_from_response, AuthError};
use crate::model::ClientSecretDefinition;
use crate::scope::ScopeSet;
use crate::token::Token;

/// Fixed anti-replay state sent with every authorization request.
pub const STATE_TOKEN: &str = "state-token";

/// Where the interactive flow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizerState {
    /// Nothing has happened yet.
    AwaitingConsent,
    /// An authorization URL was issued; waiting for the operator's code.
    AwaitingCode,
    /// A token was obtained.
    Authorized,
    /// The code exchange failed.
    Failed,
}

impl AuthorizerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authorized | Self::Failed)
    }
}

/// Source of the authorization code for a given URL.
pub trait CodePrompt {
    /// Show `url` to the operator and return the code they obtained.
    fn request_code(&self, url: &Url) -> Result<String, AuthError>;
}

impl<F> CodePrompt for F
where
    F: Fn(&Url) -> Result<String, AuthError>,
{
    fn request_code(&self, url: &Url) -> Result<String, AuthError> {
        self(url)
    }
}

/// Prints the URL to stdout and reads one line from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompt;

impl CodePrompt for ConsolePrompt {
    fn request_code(&self, url: &Url) -> Result<String, AuthError> {
        let io_error = |e: io::Error| AuthError::Exchange {
            message: format!("failed to read authorization code: {}", e),
        };

        let mut stdout = io::stdout().lock();
        writeln!(
            stdout,
            "Go to the following link in your browser then type the authorization code:\n{}",
            url
        )
        .map_err(io_error)?;
        write!(stdout, "Enter the code: ").map_err(io_error)?;
        stdout.flush().map_err(io_error)?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map_err(io_error)?;

        let code = line.trim().to_string();
        if code.is_empty() {
            return Err(AuthError::Exchange {
                message: "no authorization code entered".to_string(),
            });
        }
        Ok(code)
    }
}

/// Drives one delegated authorization.
///
/// An authorizer is single-use: once it reaches [`AuthorizerState::Authorized`]
/// or [`AuthorizerState::Failed`], start a new one.
pub struct InteractiveAuthorizer {
    state: AuthorizerState,
    client: Option<BasicClient>,
}

impl InteractiveAuthorizer {
    pub fn new() -> Self {
        Self {
            state: AuthorizerState::AwaitingConsent,
            client: None,
        }
    }

    pub fn state(&self) -> AuthorizerState {
        self.state
    }

    /// Parse `client_secret` and build the authorization URL for `scopes`.
    ///
    /// Calling `begin` again while awaiting the code re-issues the URL. A
    /// malformed definition leaves the state unchanged.
    pub fn begin(&mut self, client_secret: &[u8], scopes: &ScopeSet) -> Result<Url, AuthError> {
        if self.state.is_terminal() {
            return Err(AuthError::Exchange {
                message: format!("authorization flow already finished ({:?})", self.state),
            });
        }

        let definition = ClientSecretDefinition::from_json(client_secret)?;
        let client = create_oauth_client(&definition)?;

        let mut request = client.authorize_url(|| CsrfToken::new(STATE_TOKEN.to_string()));
        for scope in scopes.iter() {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (url, _state) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        tracing::debug!(
            client_id = %definition.client_id,
            scopes = scopes.len(),
            "Issued authorization URL"
        );

        self.client = Some(client);
        self.state = AuthorizerState::AwaitingCode;
        Ok(url)
    }

    /// Exchange the operator-supplied code for a token.
    pub async fn complete(&mut self, code: &str) -> Result<Token, AuthError> {
        let client = match (self.state, self.client.as_ref()) {
            (AuthorizerState::AwaitingCode, Some(client)) => client,
            (state, _) => {
                return Err(AuthError::Exchange {
                    message: format!("no authorization in progress ({:?}); call begin first", state),
                });
            }
        };

        let result = client
            .exchange_code(AuthorizationCode::new(code.trim().to_string()))
            .request_async(async_http_client)
            .await;

        let outcome = match result {
            Ok(response) => token_from_response(&response, None),
            Err(e) => Err(AuthError::Exchange {
                message: format!("token exchange failed: {}", e),
            }),
        };

        match &outcome {
            Ok(_) => {
                tracing::debug!("Authorization code exchanged");
                self.state = AuthorizerState::Authorized;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Authorization code exchange failed");
                self.state = AuthorizerState::Failed;
            }
        }
        self.client = None;
        outcome
    }

    /// Run the whole flow: begin, ask `prompt` for the code, complete.
    pub async fn authorize(
        &mut self,
        client_secret: &[u8],
        scopes: &ScopeSet,
        prompt: &dyn CodePrompt,
    ) -> Result<Token, AuthError> {
        let url = self.begin(client_secret, scopes)?;
        let code = prompt.request_code(&url)?;
        self.complete(&code).await
    }
}

impl Default for InteractiveAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_secret() -> Vec<u8> {
        br#"{"installed":{"client_id":"client-id","client_secret":"shh",
            "auth_uri":"https://example.com/auth","token_uri":"https://example.com/token",
            "redirect_uris":["urn:ietf:wg:oauth:2.0:oob"]}}"#
            .to_vec()
    }

    #[test]
    fn test_begin_builds_url() {
        let mut authorizer = InteractiveAuthorizer::new();
        let scopes: ScopeSet = ["scope.a", "scope.b"].into_iter().collect();

        let url = authorizer.begin(&client_secret(), &scopes).unwrap();
        let url = url.as_str();

        assert!(url.starts_with("https://example.com/auth"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("scope.a"));
        assert!(url.contains("scope.b"));
        assert!(url.contains(&format!("state={}", STATE_TOKEN)));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert_eq!(authorizer.state(), AuthorizerState::AwaitingCode);
    }

    #[test]
    fn test_begin_with_malformed_definition() {
        let mut authorizer = InteractiveAuthorizer::new();
        let result = authorizer.begin(b"{\"nope\":1}", &ScopeSet::new());

        assert!(matches!(result, Err(AuthError::Config { .. })));
        assert_eq!(authorizer.state(), AuthorizerState::AwaitingConsent);
    }

    #[tokio::test]
    async fn test_complete_before_begin() {
        let mut authorizer = InteractiveAuthorizer::new();
        let result = authorizer.complete("code").await;

        assert!(matches!(result, Err(AuthError::Exchange { .. })));
        assert_eq!(authorizer.state(), AuthorizerState::AwaitingConsent);
    }

    #[tokio::test]
    async fn test_prompt_error_stops_flow() {
        let mut authorizer = InteractiveAuthorizer::new();
        let prompt = |_: &Url| -> Result<String, AuthError> {
            Err(AuthError::Exchange {
                message: "operator cancelled".to_string(),
            })
        };

        let result = authorizer
            .authorize(&client_secret(), &ScopeSet::new(), &prompt)
            .await;

        assert!(result.is_err());
        assert_eq!(authorizer.state(), AuthorizerState::AwaitingCode);
    }
}
