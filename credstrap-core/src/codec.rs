//! Token codec: [`Token`] to durable bytes and back.
//!
//! Encoding is plain JSON with a fixed field order. Decoding ignores unknown
//! fields and also accepts a relative `expires_in` (seconds), which is turned
//! into an absolute expiry at decode time.
//!
//! An `expiry` of `0001-01-01T00:00:00Z` is Go's zero time, which Go OAuth
//! tooling writes for tokens that never expire; it decodes as no expiry.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::Error as _;
use thiserror::Error;

use crate::token::{Token, expiry_after};

/// Unix timestamp of Go's zero `time.Time`.
const GO_ZERO_TIME_SECONDS: i64 = -62_135_596_800;

/// Error type for codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The token could not be represented as bytes.
    #[error("failed to encode token: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes are not a valid encoded token.
    #[error("failed to decode token: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Deserialize)]
struct TokenFile {
    #[serde(flatten)]
    token: Token,

    #[serde(default)]
    expires_in: Option<i64>,
}

/// Serialize a token to bytes.
pub fn encode(token: &Token) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(token).map_err(CodecError::Encode)
}

/// Parse a token from bytes.
pub fn decode(bytes: &[u8]) -> Result<Token, CodecError> {
    let TokenFile { mut token, expires_in } =
        serde_json::from_slice(bytes).map_err(CodecError::Decode)?;

    if token.expiry.is_some_and(is_zero_time) {
        token.expiry = None;
    }

    if token.expiry.is_none() {
        if let Some(seconds) = expires_in {
            let expiry = expiry_after(seconds).ok_or_else(|| {
                CodecError::Decode(serde_json::Error::custom(format!(
                    "expires_in out of range: {}",
                    seconds
                )))
            })?;
            token.expiry = Some(expiry);
        }
    }

    Ok(token)
}

fn is_zero_time(expiry: DateTime<Utc>) -> bool {
    expiry.timestamp() == GO_ZERO_TIME_SECONDS && expiry.timestamp_subsec_nanos() == 0
}
