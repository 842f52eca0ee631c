//! Refresh-token exchange.

use everyplan_core::{CredentialPair, looks_like_jwt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};

/// A response body that may or may not be wrapped in the backend's
/// `{ success, message, data }` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(inner) => inner,
        }
    }
}

/// Parses a body that may be enveloped.
pub(crate) fn parse_enveloped<T: DeserializeOwned>(body: &[u8]) -> SessionResult<T> {
    serde_json::from_slice::<Envelope<T>>(body)
        .map(Envelope::into_inner)
        .map_err(|e| SessionError::invalid_response(format!("unexpected body: {}", e)))
}

/// Exchanges a refresh token for a new credential pair.
///
/// Any non-2xx status is a renewal failure. The renewed access token must be
/// JWT-shaped; anything else is rejected before it can reach the store.
pub async fn request_renewal(
    http: &reqwest::Client,
    config: &SessionConfig,
    refresh_token: &str,
) -> SessionResult<CredentialPair> {
    let url = config.refresh_url()?;
    debug!(%url, "requesting credential renewal");

    let response = http
        .post(url)
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .map_err(SessionError::transport)?;

    let status = response.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "renewal endpoint rejected refresh token");
        return Err(SessionError::http(status.as_u16()));
    }

    let body = response.bytes().await.map_err(SessionError::transport)?;
    let pair: CredentialPair = parse_enveloped(&body)?;

    if !looks_like_jwt(pair.access_token()) {
        return Err(SessionError::malformed_credential(
            "renewed access token is not JWT-shaped",
        ));
    }

    info!("credential renewal succeeded");
    Ok(pair)
}
