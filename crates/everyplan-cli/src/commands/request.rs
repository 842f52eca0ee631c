//! `everyplan request`: one authenticated API exchange.

use everyplan_session::{ApiRequest, Gateway, bootstrap};
use reqwest::Method;
use serde_json::Value;
use tracing::warn;

use crate::commands::session_context;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Parses a method name, case-insensitively.
pub fn parse_method(method: &str) -> CliResult<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::Usage(format!("invalid HTTP method `{}`", method)))
}

/// Builds the request from command-line input.
pub fn build_request(method: &str, path: &str, body: Option<&str>) -> CliResult<ApiRequest> {
    let mut request = ApiRequest::new(parse_method(method)?, path);
    if let Some(body) = body {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| CliError::Usage(format!("--body is not valid JSON: {}", e)))?;
        request = request.with_body(value);
    }
    Ok(request)
}

/// Sends the request and prints the status and body.
pub async fn request(
    config: &CliConfig,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> CliResult<()> {
    let request = build_request(method, path, body)?;
    let ctx = session_context(config)?;
    if !bootstrap(&ctx).await.is_authenticated() {
        warn!("no credentials available, sending request without a bearer token");
    }

    let response = Gateway::new(ctx).send(request).await?;
    println!("{}", response.status);
    if response.body.is_empty() {
        return Ok(());
    }
    match serde_json::from_slice::<Value>(&response.body) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", response.text()),
        },
        Err(_) => println!("{}", response.text()),
    }
    Ok(())
}
