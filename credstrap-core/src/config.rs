//! Credential configuration record.
//!
//! [`ApiConfig`] names where each flow finds its source material. It is read
//! from JSON (the default) or TOML and never changes after loading.
//!
//! ```json
//! {
//!   "oauth_config_path": "client_secret.json",
//!   "oauth_token_path": "token.json",
//!   "oauth_user_email": "admin@example.com",
//!   "oauth_scopes": ["https://www.googleapis.com/auth/admin.directory.user"],
//!   "service_account_key_path": "service_account.json",
//!   "service_account_scopes": ["https://mail.google.com/"]
//! }
//! ```
//!
//! Field names also accept camelCase (`oauthTokenPath`) and the older
//! `oauth_2_*` spellings.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CredstrapError;
use crate::factory;
use crate::model::ClientSecretDefinition;
use crate::oauth::assertion;
use crate::scope::ScopeSet;
use crate::store::{Secret, TokenStore};
use crate::token::Token;
use crate::transport::TransportHandle;

/// File name of the configuration inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Where each credential flow finds its inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(alias = "clientId", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(alias = "clientSecret", skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<Secret>,

    /// Client secret definition file for the interactive flow.
    #[serde(alias = "oauthConfigPath", alias = "oauth_2_config_path")]
    pub oauth_config_path: Option<PathBuf>,

    /// Token file produced by the interactive flow.
    #[serde(alias = "oauthTokenPath", alias = "oauth_2_token_path")]
    pub oauth_token_path: Option<PathBuf>,

    /// Passphrase of `oauth_token_path` when it was written encrypted.
    #[serde(alias = "oauthTokenPassphrase", skip_serializing_if = "Option::is_none")]
    pub oauth_token_passphrase: Option<Secret>,

    /// The end user; also the default impersonation subject.
    #[serde(alias = "oauthUserEmail", alias = "oauth_2_user_email")]
    pub oauth_user_email: Option<String>,

    #[serde(alias = "oauthScopes", alias = "oauth_2_scopes")]
    pub oauth_scopes: ScopeSet,

    #[serde(alias = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<Secret>,

    #[serde(alias = "refreshToken", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Secret>,

    #[serde(alias = "serviceAccountKeyPath")]
    pub service_account_key_path: Option<PathBuf>,

    #[serde(alias = "serviceAccountScopes")]
    pub service_account_scopes: ScopeSet,
}

impl ApiConfig {
    /// Default configuration path in the platform config directory.
    pub fn default_path() -> Result<PathBuf, CredstrapError> {
        let dirs = ProjectDirs::from("com", "raibid-labs", "credstrap")
            .ok_or_else(|| CredstrapError::config("configuration directory not available"))?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Parse a JSON configuration.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CredstrapError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CredstrapError::config(format!("invalid JSON configuration: {}", e)))
    }

    /// Parse a TOML configuration.
    pub fn from_toml(contents: &str) -> Result<Self, CredstrapError> {
        toml::from_str(contents)
            .map_err(|e| CredstrapError::config(format!("invalid TOML configuration: {}", e)))
    }

    /// Load a configuration file; `.toml` files are TOML, anything else JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CredstrapError> {
        let path = path.as_ref();
        let bytes = read_material(path, "configuration")?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let config = if is_toml {
            let contents = String::from_utf8(bytes).map_err(|_| {
                CredstrapError::config(format!("{} is not valid UTF-8", path.display()))
            })?;
            Self::from_toml(&contents)?
        } else {
            Self::from_json(&bytes)?
        };

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write an empty configuration to `path` for the operator to fill in.
    ///
    /// Refuses to overwrite an existing file.
    pub fn write_template(path: impl AsRef<Path>) -> Result<(), CredstrapError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(CredstrapError::config(format!(
                "{} already exists",
                path.display()
            )));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                CredstrapError::config(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let contents = serde_json::to_vec_pretty(&Self::default())
            .map_err(|e| CredstrapError::config(format!("failed to encode template: {}", e)))?;
        fs::write(path, contents).map_err(|e| {
            CredstrapError::config(format!("failed to write {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), "Wrote configuration template");
        Ok(())
    }

    /// Client secret definition bytes for the interactive flow.
    ///
    /// Read from `oauth_config_path`, or synthesized from the inline
    /// `client_id`/`client_secret` with the default endpoints.
    pub fn client_secret_definition(&self) -> Result<Vec<u8>, CredstrapError> {
        if let Some(path) = &self.oauth_config_path {
            return read_material(path, "client secret definition");
        }

        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => {
                Ok(ClientSecretDefinition::new(id.clone(), secret.expose()).to_json()?)
            }
            _ => Err(CredstrapError::config(
                "either oauth_config_path or client_id and client_secret must be set",
            )),
        }
    }

    /// The delegated token: from `oauth_token_path` (decrypted with
    /// `oauth_token_passphrase` when set), or from the inline
    /// `access_token`/`refresh_token`.
    pub fn delegated_token(&self) -> Result<Token, CredstrapError> {
        if let Some(path) = &self.oauth_token_path {
            let store = TokenStore::new();
            let token = match &self.oauth_token_passphrase {
                Some(passphrase) => store.load_encrypted(path, passphrase)?,
                None => store.load(path)?,
            };
            return Ok(token);
        }

        let access = self.access_token.as_ref().ok_or_else(|| {
            CredstrapError::config("either oauth_token_path or access_token must be set")
        })?;

        let mut token = Token::new(access.expose()).with_scopes(self.oauth_scopes.to_vec());
        token.refresh_token = self.refresh_token.clone();
        Ok(token)
    }

    /// Build a delegated transport handle from this configuration.
    pub fn delegated_client(&self) -> Result<TransportHandle, CredstrapError> {
        let client_secret = self.client_secret_definition()?;
        let token = self.delegated_token()?;
        Ok(factory::from_token(&client_secret, token, &self.oauth_scopes)?)
    }

    /// Build a service-identity transport handle acting as `subject`.
    ///
    /// An empty `subject` falls back to `oauth_user_email`.
    pub fn service_account_client(&self, subject: &str) -> Result<TransportHandle, CredstrapError> {
        let path = self
            .service_account_key_path
            .as_ref()
            .ok_or_else(|| CredstrapError::config("service_account_key_path is not set"))?;
        let key = read_material(path, "service account key")?;

        let subject = match subject {
            "" => self.oauth_user_email.as_deref().unwrap_or_default(),
            s => s,
        };

        Ok(assertion::build_client(&key, subject, &self.service_account_scopes)?)
    }
}

fn read_material(path: &Path, what: &str) -> Result<Vec<u8>, CredstrapError> {
    fs::read(path).map_err(|e| {
        CredstrapError::config(format!("failed to read {} {}: {}", what, path.display(), e))
    })
}
