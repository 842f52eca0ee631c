//! CLI configuration.
//!
//! Settings live in `~/.config/everyplan/config.toml` by default:
//!
//! ```toml
//! [api]
//! base_url = "https://api.everyplan.example"
//!
//! [session]
//! access_token = "env::EVERYPLAN_ACCESS_TOKEN"
//! refresh_token = "pass::everyplan/refresh"
//!
//! [stream]
//! auth = "query-token"
//!
//! [notifications]
//! enabled = true
//! ```
//!
//! `access_token`, `refresh_token` and `session_cookie` accept secret
//! references (see [`crate::secret`]). Command-line flags and `EVERYPLAN_*`
//! environment variables override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use everyplan_core::CredentialPair;
use everyplan_realtime::{RealtimeConfig, StreamAuth};
use everyplan_session::{MonitorConfig, RenewalPolicy, SessionConfig};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Cli;
use crate::error::{CliError, CliResult};
use crate::secret;

/// Configuration for the everyplan CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub api: ApiSettings,
    pub session: SessionSettings,
    pub stream: StreamSettings,
    pub notifications: NotificationSettings,
}

/// Backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Backend base URL; request paths are appended to it.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Credentials and token lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Access token (supports `env::` and `pass::`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Refresh token (supports `env::` and `pass::`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `name=value` session cookie exchanged for tokens at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
    /// Seconds between token checks.
    pub check_interval_secs: u64,
    /// Renew when the token expires within this many seconds.
    pub expiry_threshold_secs: u64,
    /// Renewal attempts allowed per access token.
    pub max_renewal_attempts: u32,
    /// Minimum seconds between renewal attempts.
    pub renewal_cooldown_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            session_cookie: None,
            check_interval_secs: 60,
            expiry_threshold_secs: 300,
            max_renewal_attempts: 3,
            renewal_cooldown_secs: 30,
        }
    }
}

/// Stream authentication mode as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamMode {
    #[default]
    QueryToken,
    SessionCookie,
}

impl From<StreamMode> for StreamAuth {
    fn from(mode: StreamMode) -> Self {
        match mode {
            StreamMode::QueryToken => StreamAuth::QueryToken,
            StreamMode::SessionCookie => StreamAuth::SessionCookie,
        }
    }
}

/// Event stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub auth: StreamMode,
    /// Explicit endpoint; defaults to the conventional path for `auth`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub dedup_ttl_secs: u64,
    /// Log every stream event at info level.
    pub verbose: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            auth: StreamMode::QueryToken,
            endpoint: None,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            dedup_ttl_secs: 60,
            verbose: false,
        }
    }
}

/// Desktop notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Raise a desktop notification per reminder during `watch`.
    pub enabled: bool,
    pub app_name: String,
    pub timeout_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            app_name: "everyplan".to_string(),
            timeout_secs: 10,
            icon: None,
        }
    }
}

impl CliConfig {
    /// Loads configuration from the default path; a missing file yields
    /// defaults.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("everyplan")
    }

    /// Applies command-line and environment overrides.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(ref base_url) = cli.base_url {
            self.api.base_url = base_url.clone();
        }
        if let Some(ref token) = cli.access_token {
            self.session.access_token = Some(token.clone());
        }
        if let Some(ref token) = cli.refresh_token {
            self.session.refresh_token = Some(token.clone());
        }
        if let Some(ref cookie) = cli.session_cookie {
            self.session.session_cookie = Some(cookie.clone());
        }
    }

    /// Builds the session configuration.
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let policy = RenewalPolicy::new(
            self.session.max_renewal_attempts,
            Duration::from_secs(self.session.renewal_cooldown_secs),
        );
        Ok(SessionConfig::new(&self.api.base_url)?
            .with_request_timeout(Duration::from_secs(self.api.timeout_secs))
            .with_renewal_policy(policy))
    }

    /// Builds the token monitor configuration.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig::new(Duration::from_secs(self.session.check_interval_secs))
            .with_expiry_threshold(Duration::from_secs(self.session.expiry_threshold_secs))
    }

    /// Builds the realtime configuration for a session.
    pub fn realtime_config(&self, session: &SessionConfig) -> CliResult<RealtimeConfig> {
        let mut config = RealtimeConfig::for_session(session, self.stream.auth.into())?;
        if let Some(ref endpoint) = self.stream.endpoint {
            let url = match Url::parse(endpoint) {
                Ok(url) => url,
                Err(_) => session.resolve(endpoint)?,
            };
            config = config.with_endpoint(url);
        }
        Ok(config
            .with_backoff(
                Duration::from_millis(self.stream.initial_delay_ms),
                Duration::from_millis(self.stream.max_delay_ms),
            )
            .with_dedup_ttl(Duration::from_secs(self.stream.dedup_ttl_secs))
            .with_verbose_stream_logging(self.stream.verbose))
    }

    /// Resolves the configured credential pair.
    ///
    /// Returns `None` when neither token is configured and an error when
    /// only one of them is.
    pub fn credentials(&self) -> CliResult<Option<CredentialPair>> {
        let access = resolve_field("access_token", self.session.access_token.as_deref())?;
        let refresh = resolve_field("refresh_token", self.session.refresh_token.as_deref())?;
        match (access, refresh) {
            (None, None) => Ok(None),
            (Some(access), Some(refresh)) => CredentialPair::new(access, refresh)
                .map(Some)
                .ok_or_else(|| CliError::Config("configured tokens are empty".to_string())),
            _ => Err(CliError::Config(
                "access_token and refresh_token must be configured together".to_string(),
            )),
        }
    }

    /// Resolves the configured session cookie.
    pub fn session_cookie(&self) -> CliResult<Option<String>> {
        resolve_field("session_cookie", self.session.session_cookie.as_deref())
    }
}

fn resolve_field(name: &str, value: Option<&str>) -> CliResult<Option<String>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let resolved = secret::resolve(raw)
        .map_err(|e| CliError::Config(format!("failed to resolve {}: {}", name, e)))?;
    Ok(Some(resolved).filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_library_defaults() {
        let config = CliConfig::default();
        let session = config.session_config().unwrap();
        assert_eq!(session.renewal, RenewalPolicy::default());
        assert_eq!(config.monitor_config(), MonitorConfig::default());

        let realtime = config.realtime_config(&session).unwrap();
        assert_eq!(realtime.auth, StreamAuth::QueryToken);
        assert_eq!(realtime.initial_delay, Duration::from_secs(1));
        assert_eq!(realtime.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn parses_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[api]
base_url = "https://api.example.com"
timeout_secs = 10

[session]
access_token = "h.p.s"
refresh_token = "r.r.r"
check_interval_secs = 15

[stream]
auth = "session-cookie"
endpoint = "/api/notifications/subscribe"
verbose = true

[notifications]
enabled = true
"#
        )
        .unwrap();

        let config = CliConfig::load_from(file.path()).unwrap();
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.session.check_interval_secs, 15);
        assert_eq!(config.session.expiry_threshold_secs, 300);
        assert_eq!(config.stream.auth, StreamMode::SessionCookie);
        assert!(config.notifications.enabled);

        let pair = config.credentials().unwrap().unwrap();
        assert_eq!(pair.access_token(), "h.p.s");

        let session = config.session_config().unwrap();
        let realtime = config.realtime_config(&session).unwrap();
        assert_eq!(realtime.auth, StreamAuth::SessionCookie);
        assert_eq!(
            realtime.endpoint.as_str(),
            "https://api.example.com/api/notifications/subscribe"
        );
        assert!(realtime.verbose_stream_logging);
    }

    #[test]
    fn empty_file_is_default() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert!(config.credentials().unwrap().is_none());
        assert!(config.session_cookie().unwrap().is_none());
    }

    #[test]
    fn partial_credentials_are_rejected() {
        let config: CliConfig = toml::from_str("[session]\naccess_token = \"h.p.s\"\n").unwrap();
        assert!(matches!(config.credentials(), Err(CliError::Config(_))));
    }

    #[test]
    fn env_references_resolve() {
        unsafe {
            std::env::set_var("_EVERYPLAN_CFG_COOKIE", "SESSION=xyz");
        }
        let config: CliConfig =
            toml::from_str("[session]\nsession_cookie = \"env::_EVERYPLAN_CFG_COOKIE\"\n").unwrap();
        assert_eq!(
            config.session_cookie().unwrap().as_deref(),
            Some("SESSION=xyz")
        );
        unsafe {
            std::env::remove_var("_EVERYPLAN_CFG_COOKIE");
        }
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let mut config = CliConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(
            config.session_config(),
            Err(CliError::Session(_))
        ));
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = CliConfig::load_from(Path::new("/nonexistent/everyplan.toml")).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
