//! The access/refresh credential pair.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::claims::looks_like_jwt;

/// An access/refresh credential pair.
///
/// A pair is either fully present or fully absent: [`CredentialPair::new`]
/// refuses to build a pair when either side is empty, so code holding an
/// `Option<CredentialPair>` never observes a partial session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCredentialPair")]
pub struct CredentialPair {
    access_token: String,
    refresh_token: String,
}

impl CredentialPair {
    /// Builds a pair, returning `None` if either token is empty.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Option<Self> {
        let access_token = access_token.into();
        let refresh_token = refresh_token.into();
        if access_token.trim().is_empty() || refresh_token.trim().is_empty() {
            return None;
        }
        Some(Self {
            access_token,
            refresh_token,
        })
    }

    /// Builds a pair from two optional halves.
    pub fn from_parts(access_token: Option<String>, refresh_token: Option<String>) -> Option<Self> {
        match (access_token, refresh_token) {
            (Some(access), Some(refresh)) => Self::new(access, refresh),
            _ => None,
        }
    }

    /// Returns the access token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token.
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Returns a new pair with the access token replaced and the same refresh token.
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Option<Self> {
        Self::new(access_token, self.refresh_token.clone())
    }

    /// Returns true if both halves are JWT-shaped.
    pub fn is_well_formed(&self) -> bool {
        looks_like_jwt(&self.access_token) && looks_like_jwt(&self.refresh_token)
    }

    /// Consumes the pair, returning `(access, refresh)`.
    pub fn into_parts(self) -> (String, String) {
        (self.access_token, self.refresh_token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentialPair {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl TryFrom<RawCredentialPair> for CredentialPair {
    type Error = &'static str;

    fn try_from(raw: RawCredentialPair) -> Result<Self, Self::Error> {
        Self::from_parts(raw.access_token, raw.refresh_token)
            .ok_or("credential pair requires both accessToken and refreshToken")
    }
}

// Tokens are bearer secrets; keep them out of debug output.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Returns true only when both halves are present and non-empty.
pub fn is_authenticated(access_token: Option<&str>, refresh_token: Option<&str>) -> bool {
    matches!(
        (access_token, refresh_token),
        (Some(a), Some(r)) if !a.trim().is_empty() && !r.trim().is_empty()
    )
}
