//! CLI error types.

use std::fmt;

use everyplan_realtime::RealtimeError;
use everyplan_session::SessionError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end a CLI command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// IO error.
    Io(std::io::Error),
    /// Session or API failure.
    Session(SessionError),
    /// Event stream setup failure.
    Realtime(RealtimeError),
    /// No usable credentials could be established.
    NotLoggedIn,
    /// The session ended while a command was running.
    SessionEnded,
    /// Bad command-line input.
    Usage(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Session(err) => write!(f, "{}", err),
            Self::Realtime(err) => write!(f, "{}", err),
            Self::NotLoggedIn => write!(
                f,
                "not logged in: configure [session] access/refresh tokens or a session cookie"
            ),
            Self::SessionEnded => write!(f, "session ended, log in again"),
            Self::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Session(err) => Some(err),
            Self::Realtime(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<RealtimeError> for CliError {
    fn from(err: RealtimeError) -> Self {
        Self::Realtime(err)
    }
}
