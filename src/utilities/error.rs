//! Utility failure taxonomy.

use crate::resilience::DeadlineExceeded;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UtilityError {
    /// The webpage fetch did not finish in time.
    #[error("Request timeout while fetching the URL")]
    UpstreamTimeout,

    /// The webpage could not be fetched. The message is safe to show clients.
    #[error("{0}")]
    Upstream(String),

    /// The input was well formed but the utility cannot process it.
    #[error("{0}")]
    Unprocessable(String),

    #[error("Pattern matching did not finish within {0} ms")]
    ExecutionTimeout(u64),

    /// Logged, never shown to clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DeadlineExceeded> for UtilityError {
    fn from(_: DeadlineExceeded) -> Self {
        UtilityError::UpstreamTimeout
    }
}

impl From<tokio::task::JoinError> for UtilityError {
    fn from(e: tokio::task::JoinError) -> Self {
        UtilityError::Internal(format!("blocking task failed: {e}"))
    }
}
