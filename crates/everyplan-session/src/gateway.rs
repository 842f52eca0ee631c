//! Authenticated request gateway.
//!
//! Every API call goes through [`Gateway::send`], which attaches the current
//! bearer token, picks up server-rotated tokens, and on a 401 renews the
//! credentials once and retries the original request once. A renewal that
//! fails, or a retry that is still rejected, ends the session.
//!
//! Absolute URLs on another origin are sent without credentials and their
//! responses never touch the session: no rotated-token capture, no renewal.

use everyplan_core::looks_like_jwt;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::context::SessionContext;
use crate::error::{SessionError, SessionResult};
use crate::request::{ApiRequest, ApiResponse};

/// Sends requests on behalf of the current session.
#[derive(Debug, Clone)]
pub struct Gateway {
    ctx: SessionContext,
}

impl Gateway {
    /// Creates a gateway over the given session.
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Returns the session context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Performs one logical exchange.
    ///
    /// At most one renewal round-trip and one retry happen per call.
    pub async fn send(&self, request: ApiRequest) -> SessionResult<ApiResponse> {
        let url = self.ctx.config().resolve(&request.path)?;
        if !self.ctx.config().is_same_origin(&url) {
            debug!(method = %request.method, %url, "foreign origin, sending without credentials");
            let response = self.execute(&request, &url, None, false).await?;
            return finish(response);
        }
        let access_token = self.ctx.store().access_token();

        let response = self
            .execute(&request, &url, access_token.as_deref(), true)
            .await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return finish(response);
        }

        debug!(method = %request.method, %url, "request unauthorized, renewing credentials");
        if self.ctx.store().refresh_token().is_none() {
            return Err(self.ctx.fail_unauthorized("no refresh credential"));
        }

        // `renew` writes the new pair to the store before returning, so the
        // retry below always runs with the stored credential.
        let pair = match self.ctx.renew().await {
            Ok(pair) => pair,
            Err(e) => return Err(self.ctx.fail_unauthorized(format!("renewal failed: {}", e))),
        };

        info!(method = %request.method, %url, "retrying request with renewed credentials");
        let retry = self
            .execute(&request, &url, Some(pair.access_token()), true)
            .await?;
        if retry.status == StatusCode::UNAUTHORIZED {
            return Err(self
                .ctx
                .fail_unauthorized("request rejected after renewal"));
        }
        finish(retry)
    }

    /// Sends a request and decodes the (possibly enveloped) JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> SessionResult<T> {
        self.send(request).await?.data()
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        url: &Url,
        access_token: Option<&str>,
        trusted: bool,
    ) -> SessionResult<ApiResponse> {
        let mut builder = self
            .ctx
            .http()
            .request(request.method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(SessionError::transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        if trusted {
            self.capture_rotated_token(&headers);
        }

        let body = response.bytes().await.map_err(SessionError::transport)?;
        debug!(status = status.as_u16(), %url, "response received");
        Ok(ApiResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }

    // The server may hand out a fresh access token on any response,
    // including error responses.
    fn capture_rotated_token(&self, headers: &reqwest::header::HeaderMap) {
        let header = self.ctx.config().rotated_token_header.as_str();
        let Some(token) = headers
            .get(header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            return;
        };

        if !looks_like_jwt(token) {
            warn!(header, "ignoring malformed rotated access token");
            return;
        }
        if self.ctx.store().rotate_access_token(token) {
            info!("stored server-rotated access token");
        } else {
            debug!("rotated access token received without a stored pair, ignoring");
        }
    }
}

fn finish(response: ApiResponse) -> SessionResult<ApiResponse> {
    if response.status.is_success() {
        Ok(response)
    } else {
        Err(SessionError::http(response.status.as_u16()))
    }
}
