//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (VAULT_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → VaultConfig (validated, immutable)
//!     → shared by value / Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, CorsConfig, FetchConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ProxyTrustConfig, RateLimitConfig, SecurityConfig, ServiceConfig, TimeoutConfig, TlsConfig,
    VaultConfig,
};
