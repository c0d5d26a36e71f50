//! Domain model types for credstrap.
//!
//! This module defines the credential source material consumed by the
//! authorization flows:
//! - [`CredentialKind`] - Delegated (end-user) or service-identity credential
//! - [`ClientSecretDefinition`] - OAuth client registration for the interactive flow
//! - [`ServiceAccountKey`] - Signing identity for the assertion flow
//!
//! Both definitions are parsed from the JSON files issued by the
//! authorization server's console. Any parse problem is reported as
//! [`AuthError::Config`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::oauth::AuthError;
use crate::store::Secret;

/// Default authorization endpoint for synthesized client definitions.
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Default token endpoint for both flows.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Redirect target for out-of-band code entry.
pub const DEFAULT_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Which flow a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Acting on behalf of an end user who granted consent.
    Delegated,
    /// A service identity, optionally impersonating a subject.
    ServiceAccount,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delegated => "delegated",
            Self::ServiceAccount => "service_account",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// OAuth client registration used by the interactive flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSecretDefinition {
    pub client_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<Secret>,

    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_uris: Vec<String>,
}

/// On-disk wrapper: the registration sits under `installed` or `web`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClientSecretFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed: Option<ClientSecretDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<ClientSecretDefinition>,
}

impl ClientSecretDefinition {
    /// Build a definition for an installed application with the default
    /// endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Some(Secret::new(client_secret)),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            redirect_uris: vec![DEFAULT_REDIRECT_URI.to_string()],
        }
    }

    /// Parse a client secret file.
    pub fn from_json(bytes: &[u8]) -> Result<Self, AuthError> {
        let file: ClientSecretFile = serde_json::from_slice(bytes).map_err(|e| AuthError::Config {
            message: format!("invalid client secret definition: {}", e),
        })?;

        let definition = file.installed.or(file.web).ok_or_else(|| AuthError::Config {
            message: "client secret definition has no \"installed\" or \"web\" block".to_string(),
        })?;

        if definition.client_id.trim().is_empty() {
            return Err(AuthError::Config {
                message: "client secret definition has an empty client_id".to_string(),
            });
        }

        Ok(definition)
    }

    /// Serialize as an `installed` client secret file.
    pub fn to_json(&self) -> Result<Vec<u8>, AuthError> {
        let file = ClientSecretFile {
            installed: Some(self.clone()),
            web: None,
        };
        serde_json::to_vec_pretty(&file).map_err(|e| AuthError::Config {
            message: format!("failed to encode client secret definition: {}", e),
        })
    }

    /// The redirect URI used for authorization requests.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_REDIRECT_URI)
    }
}

/// Signing identity for the assertion flow.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    /// Sent as the `kid` header so the server can pick the right public key.
    #[serde(default)]
    pub private_key_id: Option<String>,

    /// PEM-encoded RSA private key.
    pub private_key: Secret,

    /// The service identity; becomes the assertion issuer.
    pub client_email: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Parse a service account key file.
    pub fn from_json(bytes: &[u8]) -> Result<Self, AuthError> {
        let key: Self = serde_json::from_slice(bytes).map_err(|e| AuthError::Config {
            message: format!("invalid service account key definition: {}", e),
        })?;

        if let Some(kind) = &key.key_type {
            if kind != "service_account" {
                return Err(AuthError::Config {
                    message: format!("expected a service_account key, got {:?}", kind),
                });
            }
        }

        if key.client_email.trim().is_empty() {
            return Err(AuthError::Config {
                message: "service account key has an empty client_email".to_string(),
            });
        }

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_kind_display() {
        assert_eq!(CredentialKind::Delegated.to_string(), "delegated");
        assert_eq!(CredentialKind::ServiceAccount.to_string(), "service_account");
    }

    #[test]
    fn test_parse_installed_definition() {
        let json = br#"{"installed":{"client_id":"abc.apps","client_secret":"shh",
            "auth_uri":"https://auth.example.com/auth","token_uri":"https://auth.example.com/token",
            "redirect_uris":["http://localhost"]}}"#;
        let def = ClientSecretDefinition::from_json(json).unwrap();
        assert_eq!(def.client_id, "abc.apps");
        assert_eq!(def.client_secret.unwrap().expose(), "shh");
        assert_eq!(def.token_uri, "https://auth.example.com/token");
    }

    #[test]
    fn test_parse_web_definition_with_defaults() {
        let json = br#"{"web":{"client_id":"web-client"}}"#;
        let def = ClientSecretDefinition::from_json(json).unwrap();
        assert_eq!(def.auth_uri, DEFAULT_AUTH_URI);
        assert_eq!(def.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(def.redirect_uri(), DEFAULT_REDIRECT_URI);
        assert!(def.client_secret.is_none());
    }

    #[test]
    fn test_definition_round_trips_through_json() {
        let def = ClientSecretDefinition::new("id", "secret");
        let parsed = ClientSecretDefinition::from_json(&def.to_json().unwrap()).unwrap();
        assert_eq!(parsed, def);
    }

    #[test]
    fn test_malformed_definitions() {
        for bytes in [
            &b"not json"[..],
            br#"{}"#,
            br#"{"other":{"client_id":"x"}}"#,
            br#"{"installed":{"client_id":""}}"#,
            br#"{"installed":{"client_secret":"no id"}}"#,
        ] {
            let result = ClientSecretDefinition::from_json(bytes);
            assert!(matches!(result, Err(AuthError::Config { .. })), "accepted {:?}", bytes);
        }
    }

    #[test]
    fn test_service_account_key_missing_credentials() {
        let json = br#"{"type":"service_account","project_id":"p"}"#;
        let result = ServiceAccountKey::from_json(json);
        assert!(matches!(result, Err(AuthError::Config { .. })));
    }

    #[test]
    fn test_service_account_key_wrong_type() {
        let json = br#"{"type":"authorized_user","private_key":"x","client_email":"a@b"}"#;
        let result = ServiceAccountKey::from_json(json);
        assert!(matches!(result, Err(AuthError::Config { .. })));
    }
}
