//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, timeouts > 0, addresses parse)
//! - Validate header names and CORS origins before the router is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: VaultConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};

use crate::config::schema::VaultConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every semantic constraint and report all violations.
pub fn validate_config(config: &VaultConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::new("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::new("listener.tls.key_path", "must not be empty"));
        }
    }

    if let Some(secret) = &config.auth.secret {
        if secret.trim().is_empty() {
            errors.push(ValidationError::new(
                "auth.secret",
                "must not be blank; omit it to run without a secret",
            ));
        }
    }
    if HeaderName::from_bytes(config.auth.header.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "auth.header",
            format!("'{}' is not a valid header name", config.auth.header),
        ));
    }

    let limits = &config.rate_limit;
    if limits.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
    }
    if limits.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
    }
    if limits.max_tracked_clients == 0 {
        errors.push(ValidationError::new(
            "rate_limit.max_tracked_clients",
            "must be greater than 0",
        ));
    }
    if limits.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.sweep_interval_secs",
            "must be greater than 0",
        ));
    }

    let timeouts = &config.timeouts;
    if timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }
    if timeouts.regex_millis == 0 {
        errors.push(ValidationError::new("timeouts.regex_millis", "must be greater than 0"));
    }

    if config.fetch.max_response_bytes == 0 {
        errors.push(ValidationError::new(
            "fetch.max_response_bytes",
            "must be greater than 0",
        ));
    }
    if HeaderValue::from_str(&config.fetch.user_agent).is_err() {
        errors.push(ValidationError::new("fetch.user_agent", "is not a valid header value"));
    }

    if config.security.max_body_size < 1024 {
        errors.push(ValidationError::new(
            "security.max_body_size",
            "must be at least 1024 bytes",
        ));
    }

    for origin in &config.cors.allowed_origins {
        if origin != "*" && HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{}' is not a valid origin", origin),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&VaultConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = VaultConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rate_limit.max_requests = 0;
        config.rate_limit.window_secs = 0;
        config.auth.header = "bad header".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "auth.header",
                "rate_limit.max_requests",
                "rate_limit.window_secs",
            ]
        );
    }

    #[test]
    fn test_blank_secret_rejected() {
        let mut config = VaultConfig::default();
        config.auth.secret = Some("   ".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "auth.secret");
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = VaultConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
