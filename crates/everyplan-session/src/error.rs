//! Session error types.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while managing the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No usable credential, or renewal failed. The store has been cleared
    /// and the session ended by the time a caller sees this.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Non-2xx, non-401 response.
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// A stored or received credential is not JWT-shaped.
    #[error("malformed credential: {message}")]
    MalformedCredential { message: String },

    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The response body could not be understood.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SessionError {
    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http(status: u16) -> Self {
        Self::Http { status }
    }

    /// Creates a malformed credential error.
    pub fn malformed_credential(message: impl Into<String>) -> Self {
        Self::MalformedCredential {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wraps a reqwest error, classifying timeouts and connect failures.
    pub fn transport(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timeout".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        Self::Transport {
            message,
            source: Some(err),
        }
    }

    /// Returns true for [`SessionError::Unauthorized`].
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns the HTTP status for [`SessionError::Http`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        assert!(SessionError::unauthorized("gone").is_unauthorized());
        assert!(!SessionError::http(500).is_unauthorized());
        assert_eq!(SessionError::http(404).status(), Some(404));
        assert_eq!(SessionError::config("x").status(), None);
    }

    #[test]
    fn display() {
        assert_eq!(SessionError::http(503).to_string(), "HTTP error: status 503");
        assert!(
            SessionError::malformed_credential("not a JWT")
                .to_string()
                .contains("not a JWT")
        );
    }
}
