//! everyplan CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use everyplan_core::{TracingConfig, TracingOutputFormat, init_tracing};
use tracing::Level;

use everyplan_cli::cli::{Cli, Command, ConfigAction};
use everyplan_cli::commands;
use everyplan_cli::config::CliConfig;
use everyplan_cli::error::CliResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = match (cli.debug, cli.log_json) {
        (true, false) => TracingConfig::cli_debug(),
        (true, true) => TracingConfig::watch().with_level(Level::DEBUG),
        (false, true) => TracingConfig::watch(),
        (false, false) => TracingConfig::default()
            .with_level(Level::WARN)
            .with_format(TracingOutputFormat::Compact),
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = match cli.config {
        Some(ref path) => CliConfig::load_from(path)?,
        None => CliConfig::load()?,
    };
    config.apply_overrides(&cli);

    match cli.command {
        Command::Watch { notify } => commands::watch::watch(&config, notify).await,
        Command::Status { json } => commands::status::status(&config, json),
        Command::Request {
            ref method,
            ref path,
            ref body,
        } => commands::request::request(&config, method, path, body.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
