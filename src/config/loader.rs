//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{LogFormat, VaultConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { name: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { name, value } => {
                write!(f, "Invalid value '{}' for environment variable {}", value, name)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<VaultConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Build the effective configuration: file (or defaults), then env overrides, then validation.
pub fn load_config<F>(path: Option<&Path>, lookup: F) -> Result<VaultConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => VaultConfig::default(),
    };

    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `VAULT_*` overrides. `lookup` is usually `|k| std::env::var(k).ok()`.
pub fn apply_env_overrides<F>(config: &mut VaultConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("VAULT_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("VAULT_API_SECRET") {
        config.auth.secret = Some(v);
    }
    if let Some(v) = lookup("VAULT_SECRET_HEADER") {
        config.auth.header = v;
    }
    if let Some(v) = lookup("VAULT_ALLOW_UNAUTHENTICATED") {
        config.auth.allow_unauthenticated = parse_bool("VAULT_ALLOW_UNAUTHENTICATED", v)?;
    }
    if let Some(v) = lookup("VAULT_RATE_LIMIT_MAX_REQUESTS") {
        config.rate_limit.max_requests = parse_num("VAULT_RATE_LIMIT_MAX_REQUESTS", v)?;
    }
    if let Some(v) = lookup("VAULT_RATE_LIMIT_WINDOW_SECS") {
        config.rate_limit.window_secs = parse_num("VAULT_RATE_LIMIT_WINDOW_SECS", v)?;
    }
    if let Some(v) = lookup("VAULT_TRUST_FORWARDED_HEADERS") {
        config.proxy.trust_forwarded_headers = parse_bool("VAULT_TRUST_FORWARDED_HEADERS", v)?;
    }
    if let Some(v) = lookup("VAULT_UPSTREAM_TIMEOUT_SECS") {
        config.timeouts.upstream_secs = parse_num("VAULT_UPSTREAM_TIMEOUT_SECS", v)?;
    }
    if let Some(v) = lookup("VAULT_ALLOWED_ORIGINS") {
        config.cors.allowed_origins = v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(v) = lookup("VAULT_LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some(v) = lookup("VAULT_LOG_FORMAT") {
        config.observability.log_format = match v.to_ascii_lowercase().as_str() {
            "text" | "plain" => LogFormat::Text,
            "json" => LogFormat::Json,
            _ => return Err(ConfigError::Env { name: "VAULT_LOG_FORMAT", value: v }),
        };
    }
    if let Some(v) = lookup("VAULT_METRICS_ENABLED") {
        config.observability.metrics_enabled = parse_bool("VAULT_METRICS_ENABLED", v)?;
    }
    if let Some(v) = lookup("VAULT_ENV") {
        config.service.environment = v;
    }
    if let Some(v) = lookup("VAULT_DEBUG") {
        config.service.debug = parse_bool("VAULT_DEBUG", v)?;
    }

    Ok(())
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env { name, value }),
    }
}

fn parse_num<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Env { name, value })
}
