//! Session bootstrap.
//!
//! Establishes the initial credential pair at startup or after a login
//! redirect, in order:
//!
//! 1. a pair already in the store (validated; malformed pairs are cleared),
//! 2. an exchange of the ambient session cookie for a token pair, retried
//!    once after a short delay because the backend may still be finishing
//!    the login when the redirect lands.
//!
//! Only a successful bootstrap marks the session authenticated; callers
//! must not start the monitor or the realtime client otherwise.

use everyplan_core::CredentialPair;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::context::SessionContext;
use crate::error::{SessionError, SessionResult};
use crate::renewal::parse_enveloped;

/// User details returned alongside tokens by the session exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_nickname: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionTokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(flatten)]
    profile: UserProfile,
}

/// How bootstrap ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A valid pair was already in memory.
    Restored,
    /// The session cookie was exchanged for a new pair.
    Exchanged(UserProfile),
    /// No credentials could be established.
    LoggedOut,
}

impl BootstrapOutcome {
    /// Returns true if the session is now authenticated.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::LoggedOut)
    }
}

/// Runs the bootstrap sequence.
pub async fn bootstrap(ctx: &SessionContext) -> BootstrapOutcome {
    if let Some(pair) = ctx.store().get() {
        if pair.is_well_formed() {
            info!("restored credentials from memory");
            ctx.signal().mark_authenticated();
            return BootstrapOutcome::Restored;
        }
        warn!("stored credentials are malformed, clearing");
        ctx.store().clear();
    }

    let exchanged = match exchange_session(ctx).await {
        Ok(exchanged) => Ok(exchanged),
        Err(e) => {
            debug!(error = %e, "session exchange failed, retrying once");
            tokio::time::sleep(ctx.config().exchange_retry_delay).await;
            exchange_session(ctx).await
        }
    };

    match exchanged {
        Ok((pair, profile)) => {
            info!(
                user = profile.user_nickname.as_deref().unwrap_or("unknown"),
                "exchanged session for credentials"
            );
            ctx.store().set(pair);
            ctx.signal().mark_authenticated();
            BootstrapOutcome::Exchanged(profile)
        }
        Err(e) => {
            warn!(error = %e, "bootstrap failed, session is logged out");
            BootstrapOutcome::LoggedOut
        }
    }
}

/// Exchanges the ambient session cookie for a credential pair.
///
/// No bearer token is attached; the cookie jar on the context's HTTP client
/// carries the session.
pub async fn exchange_session(
    ctx: &SessionContext,
) -> SessionResult<(CredentialPair, UserProfile)> {
    let url = ctx.config().session_tokens_url()?;
    debug!(%url, "exchanging session for tokens");

    let response = ctx
        .http()
        .get(url)
        .send()
        .await
        .map_err(SessionError::transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(SessionError::http(status.as_u16()));
    }

    let body = response.bytes().await.map_err(SessionError::transport)?;
    let tokens: SessionTokens = parse_enveloped(&body)?;
    let pair = CredentialPair::from_parts(tokens.access_token, tokens.refresh_token)
        .ok_or_else(|| SessionError::invalid_response("session exchange returned no tokens"))?;
    if !pair.is_well_formed() {
        return Err(SessionError::malformed_credential(
            "session exchange returned malformed tokens",
        ));
    }
    Ok((pair, tokens.profile))
}
