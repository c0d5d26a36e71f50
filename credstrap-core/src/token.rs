//! Bearer token records.
//!
//! A [`Token`] is what either authorization flow produces and what the
//! [`TokenStore`](crate::store::TokenStore) persists. The JSON layout follows
//! the common OAuth token file shape (`access_token`, `token_type`,
//! `refresh_token`, `expiry`) so files written by other tooling load as-is.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Secret;

/// Absolute expiry `seconds` from now.
///
/// Negative values yield an expiry in the past. Returns `None` when the
/// result is outside the representable range.
pub(crate) fn expiry_after(seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(seconds).and_then(|delta| Utc::now().checked_add_signed(delta))
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// A bearer credential with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The access value sent with every request.
    pub access_token: Secret,

    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Refresh value, if the authorization server issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Secret>,

    /// When the access value expires (None if unknown or non-expiring).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,

    /// Scopes granted to this token.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl Token {
    /// Create a new bearer token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token),
            token_type: default_token_type(),
            refresh_token: None,
            expiry: None,
            scopes: Vec::new(),
        }
    }

    /// Attach a refresh value.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(Secret::new(refresh_token));
        self
    }

    /// Set the expiration time.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Set the granted scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set the token type tag.
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    /// Check if this token has expired.
    ///
    /// Returns `false` if no expiration is set.
    pub fn is_expired(&self) -> bool {
        self.expiry.map(|exp| exp <= Utc::now()).unwrap_or(false)
    }

    /// Check if this token will expire within the given duration.
    pub fn expires_within(&self, duration: Duration) -> bool {
        self.expiry
            .map(|exp| exp < Utc::now() + duration)
            .unwrap_or(false)
    }

    /// Whether an expired access value can be renewed without the operator.
    pub fn is_refreshable(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Value for the `Authorization` header.
    ///
    /// Any casing of "bearer" (or an empty type) is normalized to `Bearer`.
    pub fn authorization_header(&self) -> String {
        let kind = if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer") {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", kind, self.access_token.expose())
    }
}
