//! Access token shape checks and claims decoding.
//!
//! Access tokens are compact JWTs (`header.payload.signature`). The client
//! never verifies signatures; it only reads the payload to learn when the
//! token expires and who it belongs to. Anything that fails to decode is
//! treated as expired by the helpers in this module.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while decoding token claims.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token is not three dot-separated segments.
    #[error("token is not JWT-shaped")]
    NotJwtShaped,

    /// The payload segment is not valid base64url.
    #[error("invalid payload encoding: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload is not a JSON claims object.
    #[error("invalid claims payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for claims decoding.
pub type ClaimsResult<T> = Result<T, ClaimsError>;

/// Claims read from an access token payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since the Unix epoch.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub exp: Option<i64>,

    /// Issued-at, seconds since the Unix epoch.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub iat: Option<i64>,

    /// Subject identifier.
    #[serde(default)]
    pub sub: Option<String>,

    /// Email claim, when the backend includes one.
    #[serde(default)]
    pub email: Option<String>,

    /// Every other claim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Returns the expiry instant, if the token carries one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// Returns the subject, falling back to a `userId` claim.
    pub fn subject(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .or_else(|| self.extra.get("userId").and_then(Value::as_str))
    }
}

// `exp`/`iat` are numbers per RFC 7519 but some issuers emit floats.
// Anything else decodes to `None` so the token reads as expired.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    })
}

/// Lightweight structural check: three dot-separated segments and no `@`.
///
/// The `@` guard catches the backend bug where an email address was handed
/// out in place of a token.
pub fn looks_like_jwt(token: &str) -> bool {
    token.split('.').count() == 3 && !token.contains('@')
}

/// Decodes the payload segment of a JWT-shaped token.
pub fn decode_claims(token: &str) -> ClaimsResult<TokenClaims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(ClaimsError::NotJwtShaped),
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Returns the expiry instant of a token, if decodable.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    decode_claims(token).ok()?.expires_at()
}

/// Returns true if the token is expired at `now`.
///
/// Tokens without a decodable `exp` claim count as expired.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    match expires_at(token) {
        Some(expiry) => expiry < now,
        None => true,
    }
}

/// Returns true if the token expires within `threshold` of `now`.
pub fn is_expiring_soon(token: &str, now: DateTime<Utc>, threshold: Duration) -> bool {
    match expires_at(token) {
        Some(expiry) => expiry - now < threshold,
        None => true,
    }
}

/// Returns the remaining lifetime of the token, saturating at zero.
pub fn remaining(token: &str, now: DateTime<Utc>) -> Duration {
    expires_at(token)
        .map(|expiry| (expiry - now).max(Duration::zero()))
        .unwrap_or_else(Duration::zero)
}

/// A point-in-time report on the current access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStatus {
    /// Whether an access token is present at all.
    pub has_token: bool,
    /// Whether the token is expired (or undecodable).
    pub is_expired: bool,
    /// Whether the token expires within the threshold.
    pub is_expiring_soon: bool,
    /// Remaining lifetime, zero when expired or unknown.
    pub remaining: Duration,
    /// The expiry instant, when known.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenStatus {
    /// Inspects an optional access token.
    pub fn inspect(token: Option<&str>, now: DateTime<Utc>, threshold: Duration) -> Self {
        match token {
            None => Self {
                has_token: false,
                is_expired: true,
                is_expiring_soon: true,
                remaining: Duration::zero(),
                expires_at: None,
            },
            Some(token) => Self {
                has_token: true,
                is_expired: is_expired(token, now),
                is_expiring_soon: is_expiring_soon(token, now, threshold),
                remaining: remaining(token, now),
                expires_at: expires_at(token),
            },
        }
    }
}
