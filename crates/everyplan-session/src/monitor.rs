//! Token lifecycle monitor.
//!
//! A background loop that checks the stored access token on a fixed
//! interval and renews it shortly before it expires, so requests rarely
//! have to discover expiry through a 401.
//!
//! Per tick:
//! - no pair stored: nothing to do
//! - malformed or expired access token: clear credentials, end the session
//! - expiring within the threshold: renew, subject to the renewal ledger
//! - otherwise: nothing to do
//!
//! A failed proactive renewal is not fatal: the old token may still be
//! valid, and the next tick or the gateway's 401 path will deal with it.

use chrono::Utc;
use everyplan_core::{TokenStatus, looks_like_jwt};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::context::SessionContext;
use crate::ledger::{LedgerSkip, fingerprint};

/// What a single monitor tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No credential pair is stored.
    NoCredentials,
    /// The token is valid and not close to expiry.
    Healthy { remaining: Duration },
    /// The stored access token is not JWT-shaped; credentials were cleared.
    Malformed,
    /// The token had expired; credentials were cleared.
    Expired,
    /// The token was renewed.
    Renewed,
    /// Renewal was due but the ledger refused it.
    Skipped(LedgerSkip),
    /// Renewal was attempted and failed; the old token was kept.
    RenewalFailed,
}

/// Periodically inspects and renews the stored credentials.
#[derive(Debug, Clone)]
pub struct TokenMonitor {
    ctx: SessionContext,
    config: MonitorConfig,
}

impl TokenMonitor {
    /// Creates a monitor over the given session.
    pub fn new(ctx: SessionContext, config: MonitorConfig) -> Self {
        Self { ctx, config }
    }

    /// Returns the monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Reports on the current access token.
    pub fn status(&self) -> TokenStatus {
        TokenStatus::inspect(
            self.ctx.store().access_token().as_deref(),
            Utc::now(),
            self.threshold(),
        )
    }

    /// Runs one check.
    pub async fn tick(&self) -> TickOutcome {
        let Some(pair) = self.ctx.store().get() else {
            debug!("no credentials, skipping token check");
            return TickOutcome::NoCredentials;
        };
        let access_token = pair.access_token();

        if !looks_like_jwt(access_token) {
            warn!("stored access token is malformed, ending session");
            self.ctx.end_session();
            return TickOutcome::Malformed;
        }

        let status = TokenStatus::inspect(Some(access_token), Utc::now(), self.threshold());
        if status.is_expired {
            warn!(
                fingerprint = %fingerprint(access_token),
                "access token expired, ending session"
            );
            self.ctx.end_session();
            return TickOutcome::Expired;
        }

        if !status.is_expiring_soon {
            let remaining = status.remaining.to_std().unwrap_or_default();
            debug!(remaining_secs = remaining.as_secs(), "access token healthy");
            return TickOutcome::Healthy { remaining };
        }

        let ticket = match self.ctx.ledger().try_begin(access_token) {
            Ok(ticket) => ticket,
            Err(skip) => {
                debug!(reason = %skip, "renewal due but skipped");
                return TickOutcome::Skipped(skip);
            }
        };

        info!(
            fingerprint = %ticket.fingerprint,
            attempt = ticket.attempt,
            remaining_secs = status.remaining.num_seconds(),
            "access token expiring soon, renewing"
        );
        match self.ctx.renew().await {
            Ok(_) => {
                self.ctx.ledger().record_success(&ticket);
                TickOutcome::Renewed
            }
            Err(e) => {
                warn!(error = %e, attempt = ticket.attempt, "proactive renewal failed");
                TickOutcome::RenewalFailed
            }
        }
    }

    /// Runs the monitor loop forever: one check immediately, then one per
    /// `check_interval`.
    pub async fn run(self) {
        info!(
            interval_secs = self.config.check_interval.as_secs(),
            threshold_secs = self.config.expiry_threshold.as_secs(),
            "token monitor started"
        );

        let mut interval = tokio::time::interval(self.config.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let outcome = self.tick().await;
            debug!(?outcome, "token check finished");
        }
    }

    /// Spawns the loop on the current runtime.
    pub fn spawn(self) -> MonitorHandle {
        MonitorHandle {
            task: tokio::spawn(self.run()),
        }
    }

    fn threshold(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.expiry_threshold)
            .unwrap_or_else(|_| chrono::Duration::minutes(5))
    }
}

/// Handle to a spawned monitor loop.
///
/// The monitor is meant to run for the life of the application; dropping
/// the handle does not stop it, [`MonitorHandle::teardown`] does.
#[derive(Debug)]
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stops the loop.
    pub fn teardown(self) {
        self.task.abort();
        debug!("token monitor torn down");
    }

    /// Returns true if the loop is no longer running.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
