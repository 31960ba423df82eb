//! Credential → rate limit → input validation, in that order.

use std::future::Future;
use std::sync::Arc;

use crate::admission::outcome::{Admission, AdmissionResult, Rejection};
use crate::observability::metrics;
use crate::security::credentials::CredentialValidator;
use crate::security::fingerprint::Fingerprint;
use crate::security::rate_limit::RateLimiter;
use crate::validation::{EndpointId, FieldError, InputValidator, RawPayload};

#[derive(Debug, Clone)]
pub struct AdmissionPipeline {
    credentials: CredentialValidator,
    limiter: Arc<RateLimiter>,
    validator: InputValidator,
}

impl AdmissionPipeline {
    pub fn new(credentials: CredentialValidator, limiter: Arc<RateLimiter>, validator: InputValidator) -> Self {
        Self { credentials, limiter, validator }
    }

    /// Run every stage, stopping at the first rejection.
    ///
    /// `load` reads the request body. It only runs once the caller is
    /// authenticated and counted, so a malformed payload still spends quota
    /// and an unauthenticated one never costs a body read.
    pub async fn admit<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        secret: Option<&str>,
        endpoint: EndpointId,
        load: F,
    ) -> AdmissionResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RawPayload, FieldError>>,
    {
        let result = self.run(fingerprint, secret, endpoint, load).await;

        match &result {
            Ok(_) => metrics::record_admission("admitted"),
            Err(rejection) => {
                metrics::record_admission(rejection.reason().as_str());
                tracing::debug!(
                    client = %fingerprint,
                    endpoint = %endpoint,
                    reason = rejection.reason().as_str(),
                    "Request rejected"
                );
            }
        }

        result
    }

    async fn run<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        secret: Option<&str>,
        endpoint: EndpointId,
        load: F,
    ) -> AdmissionResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RawPayload, FieldError>>,
    {
        if !self.credentials.validate(secret) {
            return Err(Rejection::Unauthorized);
        }

        let quota = self.limiter.admit(fingerprint)?;

        let raw = load()
            .await
            .map_err(|error| Rejection::InvalidInput { error, quota })?;

        let payload = self
            .validator
            .validate(endpoint, &raw)
            .map_err(|error| Rejection::InvalidInput { error, quota })?;

        Ok(Admission { quota, payload })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}
