//! Application-wide session state signal.
//!
//! Every component that can end the session (the gateway after a failed
//! renewal, the monitor on an expired token, an explicit logout) reports it
//! here, and anything that must react (UI, realtime subscription, the CLI)
//! watches the same channel.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

/// Coarse session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credentials have been established yet.
    Unauthenticated,
    /// Bootstrap or login established credentials.
    Authenticated,
    /// The session ended; carries no further detail.
    Ended,
}

/// Broadcasts [`SessionState`] transitions.
#[derive(Debug, Clone)]
pub struct SessionSignal {
    tx: Arc<watch::Sender<SessionState>>,
    rx: watch::Receiver<SessionState>,
}

impl Default for SessionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSignal {
    /// Creates a signal in the [`SessionState::Unauthenticated`] state.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(SessionState::Unauthenticated);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> SessionState {
        *self.rx.borrow()
    }

    /// Signals that credentials are now established.
    pub fn mark_authenticated(&self) {
        let previous = self.tx.send_replace(SessionState::Authenticated);
        if previous != SessionState::Authenticated {
            info!("session authenticated");
        }
    }

    /// Signals that the session has ended.
    pub fn terminate(&self) {
        let previous = self.tx.send_replace(SessionState::Ended);
        if previous != SessionState::Ended {
            error!("session ended");
        }
    }

    /// Returns true if the session has ended.
    pub fn is_ended(&self) -> bool {
        self.current() == SessionState::Ended
    }

    /// Returns a receiver for observing every transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Returns a future that completes when the session ends.
    pub fn ended(&self) -> SessionEnded {
        SessionEnded {
            rx: self.tx.subscribe(),
        }
    }
}

/// A future-producing handle that completes once the session has ended.
pub struct SessionEnded {
    rx: watch::Receiver<SessionState>,
}

impl SessionEnded {
    /// Waits for [`SessionState::Ended`].
    pub async fn wait(mut self) {
        // The sender lives in every `SessionSignal` clone; an error here
        // means all of them are gone, which is as final as an ended session.
        let _ = self
            .rx
            .wait_for(|state| *state == SessionState::Ended)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn transitions() {
        let signal = SessionSignal::new();
        assert_eq!(signal.current(), SessionState::Unauthenticated);

        signal.mark_authenticated();
        assert_eq!(signal.current(), SessionState::Authenticated);
        assert!(!signal.is_ended());

        signal.terminate();
        assert!(signal.is_ended());

        // Terminating twice is harmless.
        signal.terminate();
        assert!(signal.is_ended());
    }

    #[test]
    fn clones_share_state() {
        let signal = SessionSignal::new();
        let other = signal.clone();
        other.terminate();
        assert!(signal.is_ended());
    }

    #[tokio::test]
    async fn ended_wait() {
        let signal = SessionSignal::new();
        let ended = signal.ended();

        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.terminate();
        });

        let result = tokio::time::timeout(Duration::from_millis(500), ended.wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn ended_wait_after_the_fact() {
        let signal = SessionSignal::new();
        signal.terminate();
        let result = tokio::time::timeout(Duration::from_millis(50), signal.ended().wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn subscribe_sees_authenticated() {
        let signal = SessionSignal::new();
        let mut rx = signal.subscribe();
        signal.mark_authenticated();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Authenticated);
    }
}
