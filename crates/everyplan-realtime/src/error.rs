//! Error types for the realtime client.
//!
//! None of these end the subscription: they are delivered to the handler's
//! `on_error` and the reconnection loop carries on.

use thiserror::Error;

/// Errors surfaced by the realtime client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealtimeError {
    /// Connection-level failure: refused, reset, or a broken stream.
    #[error("stream transport error: {message}")]
    Transport { message: String },

    /// An event body that could not be parsed; the event is dropped.
    #[error("malformed {event} payload: {message}")]
    MalformedPayload { event: String, message: String },

    /// The stream endpoint answered with a non-2xx status.
    #[error("stream endpoint returned HTTP {status}")]
    Http { status: u16 },

    /// The client was configured with an unusable endpoint.
    #[error("realtime configuration error: {message}")]
    Config { message: String },
}

impl RealtimeError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a malformed payload error for the named event.
    pub fn malformed(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            event: event.into(),
            message: message.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http(status: u16) -> Self {
        Self::Http { status }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RealtimeError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::http(status.as_u16());
        }
        Self::transport(err.to_string())
    }
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            RealtimeError::http(401).to_string(),
            "stream endpoint returned HTTP 401"
        );
        assert_eq!(
            RealtimeError::malformed("reminder", "expected value").to_string(),
            "malformed reminder payload: expected value"
        );
    }
}
