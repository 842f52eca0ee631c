//! Session lifecycle: credential store, request gateway, token monitor,
//! bootstrap.
//!
//! ```text
//!   bootstrap ──► CredentialStore ◄── TokenMonitor (periodic renewal)
//!                   ▲        ▲
//!                   │        └── realtime client (reads access token)
//!                Gateway (bearer + renew-once-on-401)
//!                   │
//!                   ▼
//!             SessionSignal ──► "session ended" for the whole app
//! ```
//!
//! # Example
//!
//! ```ignore
//! use everyplan_session::{ApiRequest, Gateway, SessionConfig, SessionContext, bootstrap};
//!
//! let ctx = SessionContext::new(SessionConfig::new("https://api.example.com")?)?;
//! if bootstrap(&ctx).await.is_authenticated() {
//!     let gateway = Gateway::new(ctx.clone());
//!     let response = gateway.send(ApiRequest::get("/api/schedule/date/2024-05-01")).await?;
//! }
//! ```

mod bootstrap;
mod config;
mod context;
mod error;
mod gateway;
mod ledger;
mod monitor;
mod renewal;
mod request;
mod signal;
mod store;

pub use bootstrap::{BootstrapOutcome, UserProfile, bootstrap, exchange_session};
pub use config::{
    DEFAULT_REFRESH_PATH, DEFAULT_ROTATED_TOKEN_HEADER, DEFAULT_SESSION_TOKENS_PATH,
    MonitorConfig, RenewalPolicy, SessionConfig,
};
pub use context::{SessionContext, SessionContextBuilder};
pub use error::{SessionError, SessionResult};
pub use gateway::Gateway;
pub use ledger::{LedgerSkip, RenewalLedger, RenewalTicket, fingerprint};
pub use monitor::{MonitorHandle, TickOutcome, TokenMonitor};
pub use renewal::request_renewal;
pub use request::{ApiRequest, ApiResponse};
pub use signal::{SessionEnded, SessionSignal, SessionState};
pub use store::CredentialStore;
