//! Secret references in configuration values.
//!
//! Token and cookie fields in `config.toml` may point elsewhere instead of
//! holding the secret inline:
//!
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - `pass::path/in/store` takes the first line of `pass show path/in/store`
//! - anything else is used verbatim

use std::process::Command;

/// Where a configured secret comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Env(&'a str),
    Pass(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    /// Classifies a raw configuration value.
    pub fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else {
            Self::Plain(value)
        }
    }

    /// Produces the secret value.
    pub fn resolve(&self) -> Result<String, String> {
        match *self {
            Self::Plain(value) => Ok(value.to_string()),
            Self::Env(var) => {
                std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
            }
            Self::Pass(path) => first_line_of_pass(path),
        }
    }
}

/// Resolves a configuration value that may be a secret reference.
/// Surrounding whitespace is trimmed from the result.
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value)
        .resolve()
        .map(|secret| secret.trim().to_string())
}

fn first_line_of_pass(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;
    if !output.status.success() {
        return Err(format!(
            "`pass show {}` exited with {}",
            path, output.status
        ));
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` printed nothing", path))
}
