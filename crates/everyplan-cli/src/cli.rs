//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// everyplan - session and reminder client for the everyplan calendar
#[derive(Debug, Parser)]
#[command(name = "everyplan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "EVERYPLAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Backend base URL
    #[arg(long, env = "EVERYPLAN_BASE_URL")]
    pub base_url: Option<String>,

    /// Access token (overrides [session] access_token)
    #[arg(long, env = "EVERYPLAN_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Refresh token (overrides [session] refresh_token)
    #[arg(long, env = "EVERYPLAN_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Session cookie as name=value (overrides [session] session_cookie)
    #[arg(long, env = "EVERYPLAN_SESSION_COOKIE", hide_env_values = true)]
    pub session_cookie: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keep the session alive and print reminders as they arrive
    Watch {
        /// Show a desktop notification for each reminder
        #[arg(long)]
        notify: bool,
    },

    /// Show the state of the configured access token
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send one authenticated API request
    Request {
        /// HTTP method (GET, POST, PUT, DELETE, ...)
        method: String,

        /// Path relative to the base URL, or an absolute URL
        path: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_command() {
        let cli = Cli::try_parse_from([
            "everyplan",
            "--base-url",
            "https://api.example.com",
            "request",
            "POST",
            "/api/schedule",
            "--body",
            r#"{"title":"standup"}"#,
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("https://api.example.com"));
        match cli.command {
            Command::Request { method, path, body } => {
                assert_eq!(method, "POST");
                assert_eq!(path, "/api/schedule");
                assert!(body.is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_watch_with_notify() {
        let cli = Cli::try_parse_from(["everyplan", "-v", "watch", "--notify"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Command::Watch { notify: true }));
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["everyplan"]).is_err());
    }
}
