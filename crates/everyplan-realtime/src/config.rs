//! Realtime client configuration.

use std::time::Duration;

use everyplan_session::SessionConfig;
use url::Url;

use crate::error::{RealtimeError, RealtimeResult};

/// Default stream endpoint for [`StreamAuth::QueryToken`].
pub const DEFAULT_STREAM_PATH: &str = "/api/notifications/stream";

/// Default stream endpoint for [`StreamAuth::SessionCookie`].
pub const DEFAULT_SUBSCRIBE_PATH: &str = "/api/notifications/subscribe";

/// How the stream connection is authenticated.
///
/// The two modes never mix on one connection: a query-token attempt sends
/// no cookies and a session-cookie attempt never carries a token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamAuth {
    /// The access token travels as a `token` query parameter.
    #[default]
    QueryToken,
    /// The ambient session cookie authenticates the connection.
    SessionCookie,
}

impl StreamAuth {
    /// Returns the conventional endpoint path for this mode.
    pub fn default_path(self) -> &'static str {
        match self {
            Self::QueryToken => DEFAULT_STREAM_PATH,
            Self::SessionCookie => DEFAULT_SUBSCRIBE_PATH,
        }
    }
}

/// Realtime client configuration.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Stream endpoint, without the token query parameter.
    pub endpoint: Url,
    /// Authentication mode.
    pub auth: StreamAuth,
    /// First reconnection delay, restored after every successful open.
    pub initial_delay: Duration,
    /// Reconnection delay ceiling.
    pub max_delay: Duration,
    /// How long a reminder identifier suppresses duplicates.
    pub dedup_ttl: Duration,
    /// Log every received event at info level instead of trace.
    pub verbose_stream_logging: bool,
}

impl RealtimeConfig {
    /// Creates a config for an explicit endpoint.
    pub fn new(endpoint: Url, auth: StreamAuth) -> Self {
        Self {
            endpoint,
            auth,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            dedup_ttl: Duration::from_secs(60),
            verbose_stream_logging: false,
        }
    }

    /// Creates a config using the conventional endpoint for `auth` under
    /// the session's base URL.
    pub fn for_session(session: &SessionConfig, auth: StreamAuth) -> RealtimeResult<Self> {
        let endpoint = session
            .resolve(auth.default_path())
            .map_err(|e| RealtimeError::config(e.to_string()))?;
        Ok(Self::new(endpoint, auth))
    }

    /// Builder: use an explicit endpoint.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Builder: set the reconnection delays.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max.max(initial);
        self
    }

    /// Builder: set the deduplication window.
    pub fn with_dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }

    /// Builder: enable verbose per-event logging.
    pub fn with_verbose_stream_logging(mut self, verbose: bool) -> Self {
        self.verbose_stream_logging = verbose;
        self
    }

    /// Returns the endpoint with `token` appended as a query parameter.
    pub fn url_with_token(&self, token: &str) -> Url {
        let mut url = self.endpoint.clone();
        let encoded = urlencoding::encode(token);
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{}&token={}", existing, encoded),
            _ => format!("token={}", encoded),
        };
        url.set_query(Some(&query));
        url
    }
}
