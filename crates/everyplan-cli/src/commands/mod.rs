//! Command implementations.

pub mod config;
pub mod request;
pub mod status;
pub mod watch;

use everyplan_session::{CredentialStore, SessionContext};

use crate::config::CliConfig;
use crate::error::CliResult;

/// Builds a session context seeded with the configured credentials and
/// session cookie.
pub fn session_context(config: &CliConfig) -> CliResult<SessionContext> {
    let mut builder = SessionContext::builder(config.session_config()?);
    if let Some(pair) = config.credentials()? {
        builder = builder.with_store(CredentialStore::with_pair(pair));
    }
    if let Some(cookie) = config.session_cookie()? {
        builder = builder.with_session_cookie(cookie);
    }
    Ok(builder.build()?)
}
