//! Session configuration.

use std::time::Duration;

use url::Url;

use crate::error::{SessionError, SessionResult};

/// Default renewal endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh";

/// Default session-to-token exchange endpoint.
pub const DEFAULT_SESSION_TOKENS_PATH: &str = "/api/auth/session-tokens";

/// Response header carrying a server-rotated access token.
pub const DEFAULT_ROTATED_TOKEN_HEADER: &str = "new-access-token";

/// Configuration shared by the gateway, renewal client and bootstrap.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Origin that relative request paths are resolved against.
    pub base_url: Url,

    /// Path of the renewal endpoint.
    pub refresh_path: String,

    /// Path of the session-to-token exchange endpoint.
    pub session_tokens_path: String,

    /// Response header name for opportunistic access token rotation.
    pub rotated_token_header: String,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// Delay before the single retry of the session-token exchange.
    pub exchange_retry_delay: Duration,

    /// Renewal rate limits used by the monitor.
    pub renewal: RenewalPolicy,
}

impl SessionConfig {
    /// Creates a configuration for the given API origin.
    pub fn new(base_url: &str) -> SessionResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SessionError::config(format!("invalid base URL {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SessionError::config(format!(
                "base URL {} cannot carry paths",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            session_tokens_path: DEFAULT_SESSION_TOKENS_PATH.to_string(),
            rotated_token_header: DEFAULT_ROTATED_TOKEN_HEADER.to_string(),
            request_timeout: Duration::from_secs(30),
            exchange_retry_delay: Duration::from_secs(1),
            renewal: RenewalPolicy::default(),
        })
    }

    /// Builder: set the renewal endpoint path.
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Builder: set the session-token exchange path.
    pub fn with_session_tokens_path(mut self, path: impl Into<String>) -> Self {
        self.session_tokens_path = path.into();
        self
    }

    /// Builder: set the rotated token header name.
    pub fn with_rotated_token_header(mut self, header: impl Into<String>) -> Self {
        self.rotated_token_header = header.into();
        self
    }

    /// Builder: set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builder: set the exchange retry delay.
    pub fn with_exchange_retry_delay(mut self, delay: Duration) -> Self {
        self.exchange_retry_delay = delay;
        self
    }

    /// Builder: set the renewal policy.
    pub fn with_renewal_policy(mut self, policy: RenewalPolicy) -> Self {
        self.renewal = policy;
        self
    }

    /// Resolves a request path against the base URL.
    ///
    /// Absolute URLs pass through unchanged; anything else is appended to
    /// the base, keeping any path prefix the base carries.
    pub fn resolve(&self, path: &str) -> SessionResult<Url> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        };
        Url::parse(&joined)
            .map_err(|e| SessionError::config(format!("invalid request path {:?}: {}", path, e)))
    }

    /// Returns true if `url` has the same origin as the base URL, i.e. the
    /// session's credentials belong there.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.base_url.origin()
    }

    /// Returns the resolved renewal endpoint.
    pub fn refresh_url(&self) -> SessionResult<Url> {
        self.resolve(&self.refresh_path)
    }

    /// Returns the resolved session-token exchange endpoint.
    pub fn session_tokens_url(&self) -> SessionResult<Url> {
        self.resolve(&self.session_tokens_path)
    }
}

/// Rate limits for proactive renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    /// Maximum renewal attempts per access token fingerprint.
    pub max_attempts_per_token: u32,
    /// Minimum spacing between any two renewal attempts.
    pub cooldown: Duration,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            max_attempts_per_token: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

impl RenewalPolicy {
    /// Creates a policy with the given limits.
    pub fn new(max_attempts_per_token: u32, cooldown: Duration) -> Self {
        Self {
            max_attempts_per_token,
            cooldown,
        }
    }
}

/// Token lifecycle monitor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Interval between expiry checks.
    pub check_interval: Duration,
    /// Renew when the access token expires within this window.
    pub expiry_threshold: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            expiry_threshold: Duration::from_secs(5 * 60),
        }
    }
}

impl MonitorConfig {
    /// Creates a monitor config with the given check interval.
    pub fn new(check_interval: Duration) -> Self {
        Self {
            check_interval,
            ..Default::default()
        }
    }

    /// Builder: set the expiry threshold.
    pub fn with_expiry_threshold(mut self, threshold: Duration) -> Self {
        self.expiry_threshold = threshold;
        self
    }
}
