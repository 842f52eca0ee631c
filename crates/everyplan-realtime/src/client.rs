//! The realtime event client.
//!
//! [`RealtimeClient::subscribe`] spawns one task that owns the connection
//! and walks this state machine until stopped:
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected
//!      ▲               │              │
//!      └── backoff ◄───┴── error ◄────┘  (or server close)
//!
//! any state ──stop()/session end──► Stopped
//! ```
//!
//! Every wait (connect, read, backoff) races the stop signal, so stopping
//! takes effect at the next await point and nothing reconnects afterwards.

use std::fmt;
use std::sync::Arc;

use everyplan_core::looks_like_jwt;
use everyplan_session::{SessionContext, SessionState};
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::backoff::ReconnectBackoff;
use crate::config::{RealtimeConfig, StreamAuth};
use crate::connector::{ConnectRequest, EventConnector, FrameStream, HttpConnector, SseFrame};
use crate::dedup::DedupWindow;
use crate::error::{RealtimeError, RealtimeResult};
use crate::handler::RealtimeHandler;
use crate::payload::{EventKind, ReminderEvent, TestEvent};

/// Connection state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal.
    Stopped,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Subscribes to the server's event stream on behalf of a session.
#[derive(Clone)]
pub struct RealtimeClient {
    ctx: SessionContext,
    config: RealtimeConfig,
    connector: Arc<dyn EventConnector>,
}

impl fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RealtimeClient {
    /// Creates a client that connects over HTTP, sharing the session's
    /// cookie jar.
    pub fn new(ctx: SessionContext, config: RealtimeConfig) -> RealtimeResult<Self> {
        let connector = HttpConnector::for_session(&ctx)?;
        Ok(Self::with_connector(ctx, config, connector))
    }

    /// Creates a client with a custom transport.
    pub fn with_connector(
        ctx: SessionContext,
        config: RealtimeConfig,
        connector: impl EventConnector,
    ) -> Self {
        Self {
            ctx,
            config,
            connector: Arc::new(connector),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Starts the connection loop on the current runtime.
    ///
    /// The loop runs until [`Subscription::stop`] is called, the
    /// subscription is dropped, or the session ends.
    pub fn subscribe<H: RealtimeHandler>(&self, handler: H) -> Subscription {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let worker = Worker {
            ctx: self.ctx.clone(),
            config: self.config.clone(),
            connector: Arc::clone(&self.connector),
            state: state_tx,
            stop: stop_rx,
            session: self.ctx.signal().subscribe(),
            dispatcher: Dispatcher {
                handler,
                dedup: DedupWindow::new(self.config.dedup_ttl),
                verbose: self.config.verbose_stream_logging,
            },
        };

        Subscription {
            stop: stop_tx,
            state: state_rx,
            task: tokio::spawn(worker.run()),
        }
    }
}

/// Handle to a running subscription.
///
/// Dropping the handle stops the subscription.
#[derive(Debug)]
pub struct Subscription {
    stop: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stops the subscription. Safe to call any number of times.
    pub fn stop(&self) {
        if !self.stop.send_replace(true) {
            debug!("realtime stop requested");
        }
    }

    /// Returns true once `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits for the connection loop to exit.
    pub async fn join(self) {
        let Subscription { stop, task, .. } = self;
        if let Err(e) = task.await {
            if e.is_panic() {
                error!(error = %e, "realtime task panicked");
            }
        }
        drop(stop);
    }
}

struct Worker<H> {
    ctx: SessionContext,
    config: RealtimeConfig,
    connector: Arc<dyn EventConnector>,
    state: watch::Sender<ConnectionState>,
    stop: watch::Receiver<bool>,
    session: watch::Receiver<SessionState>,
    dispatcher: Dispatcher<H>,
}

impl<H: RealtimeHandler> Worker<H> {
    async fn run(mut self) {
        let mut backoff = ReconnectBackoff::new(self.config.initial_delay, self.config.max_delay);
        info!(
            endpoint = %self.config.endpoint,
            auth = ?self.config.auth,
            "realtime client started"
        );

        loop {
            if self.cancelled() {
                break;
            }

            if let Some(request) = self.connect_request() {
                self.set_state(ConnectionState::Connecting);
                let opened = tokio::select! {
                    biased;
                    _ = cancellation(&mut self.stop, &mut self.session) => break,
                    opened = self.connector.connect(&request) => opened,
                };

                match opened {
                    Ok(frames) => {
                        backoff.reset();
                        self.set_state(ConnectionState::Connected);
                        info!(endpoint = %self.config.endpoint, "event stream connected");
                        self.dispatcher.handler.on_open();

                        let broken = tokio::select! {
                            biased;
                            _ = cancellation(&mut self.stop, &mut self.session) => break,
                            broken = self.dispatcher.pump(frames) => broken,
                        };
                        match broken {
                            Some(e) => {
                                warn!(error = %e, "event stream broke, will reconnect");
                                self.dispatcher.handler.on_error(&e);
                            }
                            None => info!("event stream closed by server, will reconnect"),
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "event stream connection failed");
                        self.dispatcher.handler.on_error(&e);
                    }
                }
            }

            self.set_state(ConnectionState::Disconnected);
            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnecting");
            tokio::select! {
                biased;
                _ = cancellation(&mut self.stop, &mut self.session) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Stopped);
        info!("realtime client stopped");
    }

    // `None` defers this attempt to the next backoff tick.
    fn connect_request(&self) -> Option<ConnectRequest> {
        let auth = self.config.auth;
        match auth {
            StreamAuth::SessionCookie => Some(ConnectRequest {
                url: self.config.endpoint.clone(),
                auth,
            }),
            StreamAuth::QueryToken => {
                let Some(token) = self.ctx.store().access_token() else {
                    debug!("no access token yet, deferring stream connection");
                    return None;
                };
                if !looks_like_jwt(&token) {
                    warn!("access token is not JWT-shaped, waiting for renewal");
                    return None;
                }
                Some(ConnectRequest {
                    url: self.config.url_with_token(&token),
                    auth,
                })
            }
        }
    }

    fn cancelled(&self) -> bool {
        *self.stop.borrow() || *self.session.borrow() == SessionState::Ended
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            trace!(from = %previous, to = %state, "connection state changed");
        }
    }
}

async fn cancellation(stop: &mut watch::Receiver<bool>, session: &mut watch::Receiver<SessionState>) {
    tokio::select! {
        _ = stop_requested(stop) => debug!("stopping realtime client"),
        _ = session_ended(session) => info!("session ended, stopping realtime client"),
    }
}

// A closed channel counts as a stop: the subscription handle is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn session_ended(session: &mut watch::Receiver<SessionState>) {
    let _ = session
        .wait_for(|state| *state == SessionState::Ended)
        .await;
}

struct Dispatcher<H> {
    handler: H,
    dedup: DedupWindow,
    verbose: bool,
}

impl<H: RealtimeHandler> Dispatcher<H> {
    /// Reads frames until the connection ends; returns the error that broke
    /// it, or `None` on a clean close.
    async fn pump(&mut self, mut frames: FrameStream) -> Option<RealtimeError> {
        while let Some(frame) = frames.next().await {
            match frame {
                Ok(frame) => self.dispatch(&frame),
                Err(e) => return Some(e),
            }
        }
        None
    }

    fn dispatch(&mut self, frame: &SseFrame) {
        if self.verbose {
            info!(event = %frame.event, id = %frame.id, bytes = frame.data.len(), "stream event");
        } else {
            trace!(event = %frame.event, id = %frame.id, bytes = frame.data.len(), "stream event");
        }

        match EventKind::from_name(&frame.event) {
            Some(EventKind::Reminder) => self.dispatch_reminder(frame),
            Some(EventKind::Test) => self.dispatch_test(frame),
            None => trace!(event = %frame.event, "ignoring unhandled event"),
        }
    }

    fn dispatch_reminder(&mut self, frame: &SseFrame) {
        let reminder: ReminderEvent = match serde_json::from_str(&frame.data) {
            Ok(reminder) => reminder,
            Err(e) => {
                warn!(event = %frame.event, error = %e, "malformed reminder payload");
                self.handler
                    .on_error(&RealtimeError::malformed(&frame.event, e.to_string()));
                return;
            }
        };

        let Some(id) = reminder.identifier() else {
            warn!(title = %reminder.title, "reminder without schedule id, dropping");
            return;
        };
        if !self.dedup.remember_once(id, Instant::now()) {
            debug!(schedule_id = id, "duplicate reminder suppressed");
            return;
        }
        if self.verbose {
            info!(schedule_id = id, "dispatching reminder");
        }
        self.handler.on_reminder(&reminder);
    }

    fn dispatch_test(&mut self, frame: &SseFrame) {
        match serde_json::from_str::<TestEvent>(&frame.data) {
            Ok(event) => self.handler.on_test(&event),
            Err(e) => {
                warn!(error = %e, "malformed test payload");
                self.handler
                    .on_error(&RealtimeError::malformed(&frame.event, e.to_string()));
            }
        }
    }
}
