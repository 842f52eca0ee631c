//! everyplan command-line client
//!
//! A thin consumer of the session and realtime crates: it bootstraps a
//! session from configuration, keeps it renewed, prints or notifies
//! reminders, and can issue one-off authenticated API requests.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod notify;
pub mod secret;

pub use cli::Cli;
pub use error::{CliError, CliResult};
