//! End-user profile lookup.

use serde::{Deserialize, Serialize};

use crate::oauth::AuthError;
use crate::transport::TransportHandle;

/// Profile endpoint queried by [`fetch_user_info`].
pub const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo?alt=json";

/// Profile of the user a transport handle acts for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub verified_email: bool,
    pub name: String,
    pub given_name: String,
    pub family_name: String,
    pub picture: String,
    pub locale: String,
    /// Hosted domain, for managed accounts.
    pub hd: String,
}

/// Fetch the profile from [`USERINFO_URL`].
pub async fn fetch_user_info(handle: &TransportHandle) -> Result<UserInfo, AuthError> {
    fetch_user_info_from(handle, USERINFO_URL).await
}

/// Fetch the profile from a specific endpoint.
pub async fn fetch_user_info_from(handle: &TransportHandle, url: &str) -> Result<UserInfo, AuthError> {
    let response = handle.get(url).await?;
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            message: format!("user info request refused ({}): {}", status, body),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Http {
            status: status.as_u16(),
            message: body,
        });
    }

    let info: UserInfo = response.json().await.map_err(|e| AuthError::Http {
        status: status.as_u16(),
        message: format!("invalid user info response: {}", e),
    })?;

    tracing::debug!(email = %info.email, "Fetched user info");
    Ok(info)
}
