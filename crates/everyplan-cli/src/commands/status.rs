//! `everyplan status`: report on the configured access token.

use chrono::{Duration, Utc};
use everyplan_core::{TokenStatus, decode_claims};
use everyplan_session::fingerprint;
use serde_json::json;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Prints the token status.
pub fn status(config: &CliConfig, as_json: bool) -> CliResult<()> {
    let access = config
        .credentials()?
        .map(|pair| pair.access_token().to_string());
    let threshold = Duration::from_std(config.monitor_config().expiry_threshold)
        .unwrap_or_else(|_| Duration::minutes(5));
    let status = TokenStatus::inspect(access.as_deref(), Utc::now(), threshold);
    let claims = access.as_deref().and_then(|token| decode_claims(token).ok());
    let subject = claims.as_ref().and_then(|c| c.subject().map(str::to_string));
    let token_fingerprint = access.as_deref().map(fingerprint);

    if as_json {
        let report = json!({
            "has_token": status.has_token,
            "is_expired": status.is_expired,
            "is_expiring_soon": status.is_expiring_soon,
            "remaining_secs": status.remaining.num_seconds(),
            "expires_at": status.expires_at.map(|t| t.to_rfc3339()),
            "subject": subject,
            "fingerprint": token_fingerprint,
        });
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::Config(format!("failed to encode status: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    if !status.has_token {
        println!("no access token configured");
        return Ok(());
    }
    println!("fingerprint: {}", token_fingerprint.unwrap_or_default());
    if let Some(subject) = subject {
        println!("subject:     {}", subject);
    }
    match status.expires_at {
        Some(at) => println!("expires at:  {}", at.with_timezone(&chrono::Local)),
        None => println!("expires at:  unknown (treated as expired)"),
    }
    let state = if status.is_expired {
        "expired"
    } else if status.is_expiring_soon {
        "expiring soon"
    } else {
        "valid"
    };
    println!(
        "state:       {} ({}m {}s left)",
        state,
        status.remaining.num_minutes(),
        status.remaining.num_seconds() % 60
    );
    Ok(())
}
