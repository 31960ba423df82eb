//! Dev API Vault: a gated collection of developer utility endpoints.

pub mod admission;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod utilities;
pub mod validation;

pub use config::schema::VaultConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
