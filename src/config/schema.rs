//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the vault.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VaultConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Shared-secret credential settings.
    pub auth: AuthConfig,

    /// Per-client request ceiling.
    pub rate_limit: RateLimitConfig,

    /// Reverse proxy trust settings used for client fingerprinting.
    pub proxy: ProxyTrustConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Outbound webpage fetch settings.
    pub fetch: FetchConfig,

    /// Request size hardening.
    pub security: SecurityConfig,

    /// Cross-origin settings.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Deployment metadata reported by the liveness endpoints.
    pub service: ServiceConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret every gated request must present.
    pub secret: Option<String>,

    /// Header carrying the secret.
    pub header: String,

    /// Admit every request when no secret is configured.
    /// Ignored when `secret` is set. Without it, a missing secret denies everything.
    pub allow_unauthenticated: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            header: "X-RapidAPI-Proxy-Secret".to_string(),
            allow_unauthenticated: false,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per client per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Upper bound on the number of clients tracked at once.
    pub max_tracked_clients: usize,

    /// How often stale windows are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_secs: 60,
            max_tracked_clients: 100_000,
            sweep_interval_secs: 300,
        }
    }
}

/// Whether forwarded client headers can be believed.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyTrustConfig {
    /// Set only when the service sits behind a known reverse proxy.
    pub trust_forwarded_headers: bool,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds.
    pub request_secs: u64,

    /// Upstream webpage fetch timeout in seconds.
    pub upstream_secs: u64,

    /// Regex execution timeout in milliseconds.
    pub regex_millis: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
            regex_millis: 2_000,
        }
    }
}

/// Outbound fetch configuration for the word counter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Largest upstream body read before giving up.
    pub max_response_bytes: usize,

    /// Maximum redirects followed.
    pub max_redirects: usize,

    /// Permit loopback/private targets. Local development and tests only.
    pub allow_private_networks: bool,

    /// User-Agent sent upstream.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_response_bytes: 10 * 1024 * 1024,
            max_redirects: 5,
            allow_private_networks: false,
            user_agent: format!("Dev-API-Vault/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 11 * 1024 * 1024, // 10MB upload + multipart overhead
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (overridden by RUST_LOG).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "dev_api_vault=info,tower_http=info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Deployment metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Environment name (development, staging, production).
    pub environment: String,

    /// Debug mode flag, reported by `/health`.
    pub debug: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            debug: false,
        }
    }
}

impl ServiceConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: VaultConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
        assert_eq!(config.auth.header, "X-RapidAPI-Proxy-Secret");
        assert!(config.auth.secret.is_none());
        assert!(!config.auth.allow_unauthenticated);
        assert_eq!(config.rate_limit.max_requests, 60);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.cors.allowed_origins, vec!["*"]);
    }

    #[test]
    fn test_partial_sections() {
        let config: VaultConfig = toml::from_str(
            r#"
            [auth]
            secret = "s3cret"

            [rate_limit]
            max_requests = 5

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.header, "X-RapidAPI-Proxy-Secret");
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_production_detection() {
        let mut service = ServiceConfig::default();
        assert!(!service.is_production());
        service.environment = "Production".into();
        assert!(service.is_production());
    }
}
