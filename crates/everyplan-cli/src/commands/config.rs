//! Configuration commands.

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::secret::SecretRef;

/// Dumps the effective configuration with inline secrets redacted.
pub fn dump(config: &CliConfig) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(&redacted(config))
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", CliConfig::default_path().display());
    println!("{}", toml_str);
    Ok(())
}

/// Shows the configuration file path.
pub fn path() -> CliResult<()> {
    println!("config: {}", CliConfig::default_path().display());
    Ok(())
}

/// Returns a copy safe to print: references (`env::`, `pass::`) are kept,
/// inline secret values are masked.
pub fn redacted(config: &CliConfig) -> CliConfig {
    let mut copy = config.clone();
    for field in [
        &mut copy.session.access_token,
        &mut copy.session.refresh_token,
        &mut copy.session.session_cookie,
    ] {
        if let Some(value) = field.as_mut() {
            if matches!(SecretRef::parse(value), SecretRef::Plain(_)) {
                *value = "<redacted>".to_string();
            }
        }
    }
    copy
}
