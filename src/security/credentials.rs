//! Shared-secret credential check.
//!
//! # Design Decisions
//! - Comparison is constant time over the secret bytes
//! - Running without a secret is only possible through an explicit opt-in flag;
//!   otherwise every request is denied

use subtle::ConstantTimeEq;

use crate::config::AuthConfig;

/// What to do with a presented secret.
#[derive(Clone)]
pub enum CredentialPolicy {
    RequireSecret(String),
    AllowAll,
    DenyAll,
}

impl std::fmt::Debug for CredentialPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialPolicy::RequireSecret(_) => f.write_str("RequireSecret(<redacted>)"),
            CredentialPolicy::AllowAll => f.write_str("AllowAll"),
            CredentialPolicy::DenyAll => f.write_str("DenyAll"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialValidator {
    policy: CredentialPolicy,
}

impl CredentialValidator {
    pub fn new(policy: CredentialPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let policy = match &config.secret {
            Some(secret) => CredentialPolicy::RequireSecret(secret.clone()),
            None if config.allow_unauthenticated => {
                tracing::warn!("No API secret configured, authentication is DISABLED");
                CredentialPolicy::AllowAll
            }
            None => {
                tracing::warn!("No API secret configured, all gated requests will be denied");
                CredentialPolicy::DenyAll
            }
        };
        Self::new(policy)
    }

    pub fn validate(&self, presented: Option<&str>) -> bool {
        match &self.policy {
            CredentialPolicy::RequireSecret(expected) => match presented {
                Some(value) if !value.is_empty() => {
                    bool::from(value.as_bytes().ct_eq(expected.as_bytes()))
                }
                _ => false,
            },
            CredentialPolicy::AllowAll => true,
            CredentialPolicy::DenyAll => false,
        }
    }

    pub fn policy(&self) -> &CredentialPolicy {
        &self.policy
    }
}
