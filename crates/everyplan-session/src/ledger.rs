//! Renewal attempt ledger.
//!
//! Bounds how often proactive renewal may hit the network: at most
//! `max_attempts_per_token` attempts for one access token, and never two
//! attempts within `cooldown` of each other regardless of token. The
//! ledger lives only for the process lifetime.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::config::RenewalPolicy;

/// Why a renewal attempt was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerSkip {
    /// Another attempt was made less than `cooldown` ago.
    CoolingDown { remaining: Duration },
    /// This token already used up its attempts.
    AttemptsExhausted { attempts: u32 },
}

impl fmt::Display for LedgerSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoolingDown { remaining } => {
                write!(f, "cooling down for {}ms", remaining.as_millis())
            }
            Self::AttemptsExhausted { attempts } => {
                write!(f, "{} attempts already made for this token", attempts)
            }
        }
    }
}

/// A granted renewal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalTicket {
    /// Fingerprint of the access token being renewed.
    pub fingerprint: String,
    /// 1-based attempt number for this fingerprint.
    pub attempt: u32,
}

#[derive(Debug, Default)]
struct LedgerState {
    attempts: HashMap<String, u32>,
    last_attempt: Option<Instant>,
}

/// Shared renewal attempt ledger.
#[derive(Debug, Clone)]
pub struct RenewalLedger {
    policy: RenewalPolicy,
    state: Arc<Mutex<LedgerState>>,
}

impl RenewalLedger {
    /// Creates an empty ledger with the given policy.
    pub fn new(policy: RenewalPolicy) -> Self {
        Self {
            policy,
            state: Arc::new(Mutex::new(LedgerState::default())),
        }
    }

    /// Returns the policy in force.
    pub fn policy(&self) -> RenewalPolicy {
        self.policy
    }

    /// Tries to start a renewal attempt for `access_token` now.
    pub fn try_begin(&self, access_token: &str) -> Result<RenewalTicket, LedgerSkip> {
        self.try_begin_at(access_token, Instant::now())
    }

    /// Tries to start a renewal attempt for `access_token` at `now`.
    ///
    /// On success the attempt is counted and the cooldown restarts.
    pub fn try_begin_at(
        &self,
        access_token: &str,
        now: Instant,
    ) -> Result<RenewalTicket, LedgerSkip> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = state.last_attempt {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.policy.cooldown {
                return Err(LedgerSkip::CoolingDown {
                    remaining: self.policy.cooldown - elapsed,
                });
            }
        }

        let fingerprint = fingerprint(access_token);
        let attempts = state.attempts.get(&fingerprint).copied().unwrap_or(0);
        if attempts >= self.policy.max_attempts_per_token {
            return Err(LedgerSkip::AttemptsExhausted { attempts });
        }

        state.attempts.insert(fingerprint.clone(), attempts + 1);
        state.last_attempt = Some(now);
        Ok(RenewalTicket {
            fingerprint,
            attempt: attempts + 1,
        })
    }

    /// Clears the attempt count for a ticket whose renewal succeeded.
    pub fn record_success(&self, ticket: &RenewalTicket) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attempts
            .remove(&ticket.fingerprint);
    }

    /// Returns how many attempts were made for `access_token`.
    pub fn attempts(&self, access_token: &str) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attempts
            .get(&fingerprint(access_token))
            .copied()
            .unwrap_or(0)
    }
}

/// Returns a short, log-safe fingerprint of a token.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_short_and_stable() {
        let a = fingerprint("token-a");
        assert_eq!(a.len(), 16);
        assert_eq!(a, fingerprint("token-a"));
        assert_ne!(a, fingerprint("token-b"));
    }

    #[test]
    fn cooldown_blocks_any_token() {
        let ledger = RenewalLedger::new(RenewalPolicy::new(3, Duration::from_secs(30)));
        let t0 = Instant::now();

        assert!(ledger.try_begin_at("a", t0).is_ok());
        let skip = ledger
            .try_begin_at("b", t0 + Duration::from_secs(10))
            .unwrap_err();
        assert_eq!(
            skip,
            LedgerSkip::CoolingDown {
                remaining: Duration::from_secs(20)
            }
        );
        assert!(ledger.try_begin_at("b", t0 + Duration::from_secs(30)).is_ok());
    }

    #[test]
    fn at_most_three_attempts_per_token() {
        let ledger = RenewalLedger::new(RenewalPolicy::new(3, Duration::ZERO));
        let t0 = Instant::now();

        let granted = (0..4)
            .filter(|i| {
                ledger
                    .try_begin_at("same", t0 + Duration::from_secs(*i))
                    .is_ok()
            })
            .count();
        assert_eq!(granted, 3);
        assert_eq!(ledger.attempts("same"), 3);
        assert_eq!(
            ledger.try_begin_at("same", t0 + Duration::from_secs(60)),
            Err(LedgerSkip::AttemptsExhausted { attempts: 3 })
        );

        // A different token has its own budget.
        assert!(ledger.try_begin_at("other", t0 + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn four_attempts_in_ten_seconds_with_default_policy() {
        let ledger = RenewalLedger::new(RenewalPolicy::default());
        let t0 = Instant::now();
        let granted = [0, 3, 6, 9]
            .iter()
            .filter(|s| {
                ledger
                    .try_begin_at("tok", t0 + Duration::from_secs(**s))
                    .is_ok()
            })
            .count();
        assert!(granted <= 3);
        assert_eq!(granted, 1);
    }

    #[test]
    fn success_clears_fingerprint() {
        let ledger = RenewalLedger::new(RenewalPolicy::new(1, Duration::ZERO));
        let t0 = Instant::now();

        let ticket = ledger.try_begin_at("tok", t0).unwrap();
        assert_eq!(ticket.attempt, 1);
        assert!(ledger.try_begin_at("tok", t0).is_err());

        ledger.record_success(&ticket);
        assert_eq!(ledger.attempts("tok"), 0);
        assert!(ledger.try_begin_at("tok", t0).is_ok());
    }
}
