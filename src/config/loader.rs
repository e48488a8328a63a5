//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, VerbosityConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `VERBOSE`, `SHOW_QUERY_STRING`, `SHOW_BODY` and `FORMAT_JSON`.
pub fn apply_env_overrides(verbosity: &mut VerbosityConfig) {
    apply_overrides(verbosity, |key| std::env::var(key).ok());
}

fn apply_overrides<F>(verbosity: &mut VerbosityConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let flags: [(&str, &mut bool); 4] = [
        ("VERBOSE", &mut verbosity.verbose),
        ("SHOW_QUERY_STRING", &mut verbosity.show_query_string),
        ("SHOW_BODY", &mut verbosity.show_body),
        ("FORMAT_JSON", &mut verbosity.format_json),
    ];

    for (key, slot) in flags {
        let Some(raw) = lookup(key) else { continue };
        match parse_flag(&raw) {
            Some(value) => *slot = value,
            None => tracing::warn!(key, value = %raw, "Ignoring unrecognized boolean"),
        }
    }
}

/// Parse a loose boolean (`true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`).
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
