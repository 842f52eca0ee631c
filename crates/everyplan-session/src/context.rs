//! The session context.
//!
//! One `SessionContext` is built at application start and handed to the
//! gateway, the monitor and the realtime client. It replaces module-level
//! token globals with an explicit owner; clones are cheap and share state.

use std::sync::Arc;

use everyplan_core::CredentialPair;
use reqwest::cookie::Jar;
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::ledger::{RenewalLedger, fingerprint};
use crate::renewal::request_renewal;
use crate::signal::SessionSignal;
use crate::store::CredentialStore;

#[derive(Debug)]
struct ContextInner {
    config: SessionConfig,
    http: reqwest::Client,
    cookies: Option<Arc<Jar>>,
    store: CredentialStore,
    signal: SessionSignal,
    ledger: RenewalLedger,
}

/// Shared session state and HTTP client.
#[derive(Debug, Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

impl SessionContext {
    /// Creates a context with an empty store and a fresh cookie jar.
    pub fn new(config: SessionConfig) -> SessionResult<Self> {
        Self::builder(config).build()
    }

    /// Returns a builder for customising the context.
    pub fn builder(config: SessionConfig) -> SessionContextBuilder {
        SessionContextBuilder {
            config,
            store: None,
            cookies: Vec::new(),
            http: None,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Returns the HTTP client (cookie store enabled).
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Returns the cookie jar behind [`SessionContext::http`], so other
    /// clients (e.g. a long-lived stream) can share the ambient session.
    /// `None` when the context was built with an external HTTP client.
    pub fn cookie_jar(&self) -> Option<Arc<Jar>> {
        self.inner.cookies.clone()
    }

    /// Returns the credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    /// Returns the session signal.
    pub fn signal(&self) -> &SessionSignal {
        &self.inner.signal
    }

    /// Returns the renewal ledger.
    pub fn ledger(&self) -> &RenewalLedger {
        &self.inner.ledger
    }

    /// Renews the stored credential pair using the stored refresh token.
    ///
    /// On success the new pair is written to the store before this returns.
    /// Fails with [`SessionError::Unauthorized`] when no pair is stored; the
    /// store is left untouched on any failure so callers decide what a
    /// failed renewal means for them.
    pub async fn renew(&self) -> SessionResult<CredentialPair> {
        let refresh_token = self
            .store()
            .refresh_token()
            .ok_or_else(|| SessionError::unauthorized("no refresh credential"))?;

        let pair = request_renewal(self.http(), self.config(), &refresh_token).await?;
        self.store().set(pair.clone());
        Ok(pair)
    }

    /// Stores a credential pair obtained outside the normal flow
    /// (e.g. after an interactive login) and marks the session authenticated.
    pub fn establish(&self, pair: CredentialPair) -> SessionResult<()> {
        if !pair.is_well_formed() {
            return Err(SessionError::malformed_credential(
                "credential pair is not JWT-shaped",
            ));
        }
        info!(
            fingerprint = %fingerprint(pair.access_token()),
            "session established"
        );
        self.store().set(pair);
        self.signal().mark_authenticated();
        Ok(())
    }

    /// Ends the session at the user's request.
    pub fn logout(&self) {
        info!("logout requested");
        self.end_session();
    }

    /// Clears credentials and broadcasts the end of the session.
    pub(crate) fn end_session(&self) {
        self.store().clear();
        self.signal().terminate();
    }

    /// Ends the session and builds the error returned to the caller.
    pub(crate) fn fail_unauthorized(&self, message: impl Into<String>) -> SessionError {
        let message = message.into();
        warn!(reason = %message, "authorization failed, ending session");
        self.end_session();
        SessionError::unauthorized(message)
    }
}

/// Builder for [`SessionContext`].
#[derive(Debug)]
pub struct SessionContextBuilder {
    config: SessionConfig,
    store: Option<CredentialStore>,
    cookies: Vec<String>,
    http: Option<reqwest::Client>,
}

impl SessionContextBuilder {
    /// Uses an existing store (e.g. one seeded with a pair).
    pub fn with_store(mut self, store: CredentialStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Seeds the cookie jar with a `name=value` cookie for the base URL,
    /// for backends that authenticate with an ambient session cookie.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    /// Uses a prebuilt HTTP client; seeded cookies are ignored in that case.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Builds the context.
    pub fn build(self) -> SessionResult<SessionContext> {
        let (http, cookies) = match self.http {
            Some(http) => (http, None),
            None => {
                let jar = Arc::new(Jar::default());
                for cookie in &self.cookies {
                    jar.add_cookie_str(cookie, &self.config.base_url);
                }
                let http = reqwest::Client::builder()
                    .timeout(self.config.request_timeout)
                    .cookie_provider(Arc::clone(&jar))
                    .build()
                    .map_err(|e| {
                        SessionError::config(format!("failed to create HTTP client: {}", e))
                    })?;
                (http, Some(jar))
            }
        };

        let ledger = RenewalLedger::new(self.config.renewal);
        Ok(SessionContext {
            inner: Arc::new(ContextInner {
                config: self.config,
                http,
                cookies,
                store: self.store.unwrap_or_default(),
                signal: SessionSignal::new(),
                ledger,
            }),
        })
    }
}
