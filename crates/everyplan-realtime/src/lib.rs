//! Realtime reminder notifications over server-sent events.
//!
//! The client keeps a single subscription alive for the life of a session:
//! it connects with the session's credentials, reconnects with doubling
//! backoff, suppresses duplicate reminders, and reports everything through
//! a [`RealtimeHandler`].
//!
//! ```ignore
//! use everyplan_realtime::{RealtimeClient, RealtimeConfig, StreamAuth};
//! use tokio::sync::mpsc;
//!
//! let config = RealtimeConfig::for_session(ctx.config(), StreamAuth::QueryToken)?;
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let subscription = RealtimeClient::new(ctx.clone(), config)?.subscribe(tx);
//! while let Some(notification) = rx.recv().await {
//!     println!("{notification:?}");
//! }
//! subscription.stop();
//! ```

mod backoff;
mod client;
mod config;
mod connector;
mod dedup;
mod error;
mod handler;
mod payload;

pub use backoff::ReconnectBackoff;
pub use client::{ConnectionState, RealtimeClient, Subscription};
pub use config::{DEFAULT_STREAM_PATH, DEFAULT_SUBSCRIBE_PATH, RealtimeConfig, StreamAuth};
pub use connector::{BoxFuture, ConnectRequest, EventConnector, FrameStream, HttpConnector, SseFrame};
pub use dedup::DedupWindow;
pub use error::{RealtimeError, RealtimeResult};
pub use handler::{RealtimeHandler, RealtimeNotification};
pub use payload::{EventKind, REMINDER_EVENTS, ReminderEvent, TEST_EVENT, TestEvent};
