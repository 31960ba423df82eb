//! Error bodies and quota headers.
//!
//! # Design Decisions
//! - One envelope for every failure: `{"error", "detail", "status_code"}`,
//!   plus `errors` for field-level validation problems
//! - Internal causes are logged, never returned (unless debug mode is on)

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::admission::Rejection;
use crate::security::clock::epoch_secs;
use crate::security::rate_limit::Quota;
use crate::utilities::UtilityError;
use crate::validation::FieldError;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

pub const INTERNAL_DETAIL: &str = "An unexpected server error occurred";

pub fn append_quota_headers(headers: &mut HeaderMap, quota: &Quota) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(quota.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(quota.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(epoch_secs(quota.reset_at)));
}

#[derive(Debug, Serialize)]
struct FieldErrorBody {
    field: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldErrorBody>>,
}

/// A failed request, ready to render.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
    errors: Option<Vec<FieldError>>,
    quota: Option<Quota>,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            errors: None,
            quota: None,
            retry_after_secs: None,
        }
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_DETAIL)
    }

    /// Map a utility failure. `debug` exposes internal causes in the body.
    pub fn from_utility(error: UtilityError, debug: bool) -> Self {
        match error {
            UtilityError::UpstreamTimeout | UtilityError::ExecutionTimeout(_) => {
                Self::new(StatusCode::REQUEST_TIMEOUT, error.to_string())
            }
            UtilityError::Upstream(detail) => Self::new(StatusCode::BAD_GATEWAY, detail),
            UtilityError::Unprocessable(detail) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail),
            UtilityError::Internal(cause) => {
                tracing::error!(error = %cause, "Utility failed");
                if debug {
                    Self::new(StatusCode::INTERNAL_SERVER_ERROR, cause)
                } else {
                    Self::internal()
                }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        let quota = rejection.quota();
        let mut error = match rejection {
            Rejection::Unauthorized => Self::new(StatusCode::FORBIDDEN, Rejection::Unauthorized.to_string()),
            Rejection::RateLimited { retry_after, .. } => {
                let mut e = Self::new(StatusCode::TOO_MANY_REQUESTS, rejection.to_string());
                e.retry_after_secs = Some(retry_after.as_secs());
                e
            }
            Rejection::InvalidInput { error, .. } => {
                let mut e = Self::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string());
                e.errors = Some(vec![error]);
                e
            }
        };
        error.quota = quota;
        error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.status.canonical_reason().unwrap_or("Error"),
            detail: self.detail,
            status_code: self.status.as_u16(),
            errors: self.errors.map(|errors| {
                errors
                    .into_iter()
                    .map(|e| FieldErrorBody { field: e.field, message: e.message })
                    .collect()
            }),
        };

        let mut response = (self.status, Json(body)).into_response();
        let headers = response.headers_mut();
        if let Some(quota) = &self.quota {
            append_quota_headers(headers, quota);
        }
        if let Some(secs) = self.retry_after_secs {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
