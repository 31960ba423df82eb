//! Admission outcomes.

use std::time::Duration;

use crate::security::rate_limit::{Quota, RateLimitExceeded};
use crate::validation::{FieldError, TypedPayload};

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    Unauthorized,
    RateLimited,
    InvalidInput,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::Unauthorized => "unauthorized",
            RejectionReason::RateLimited => "rate_limited",
            RejectionReason::InvalidInput => "invalid_input",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Rejection {
    #[error("Invalid or missing API secret.")]
    Unauthorized,

    #[error("Rate limit exceeded. Try again in {} seconds.", .retry_after.as_secs())]
    RateLimited { quota: Quota, retry_after: Duration },

    #[error("{error}")]
    InvalidInput { error: FieldError, quota: Quota },
}

impl Rejection {
    pub fn reason(&self) -> RejectionReason {
        match self {
            Rejection::Unauthorized => RejectionReason::Unauthorized,
            Rejection::RateLimited { .. } => RejectionReason::RateLimited,
            Rejection::InvalidInput { .. } => RejectionReason::InvalidInput,
        }
    }

    /// Quota metadata, present once the request reached the limiter.
    pub fn quota(&self) -> Option<Quota> {
        match self {
            Rejection::Unauthorized => None,
            Rejection::RateLimited { quota, .. } | Rejection::InvalidInput { quota, .. } => Some(*quota),
        }
    }
}

impl From<RateLimitExceeded> for Rejection {
    fn from(e: RateLimitExceeded) -> Self {
        Rejection::RateLimited { quota: e.quota, retry_after: e.retry_after }
    }
}

/// A request that passed every stage.
#[derive(Debug, Clone)]
pub struct Admission {
    pub quota: Quota,
    pub payload: TypedPayload,
}

pub type AdmissionResult = Result<Admission, Rejection>;
