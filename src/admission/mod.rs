//! Admission subsystem.
//!
//! # Data Flow
//! ```text
//! (fingerprint, presented secret, endpoint, body loader)
//!     → CredentialValidator   → Unauthorized
//!     → RateLimiter           → RateLimited (carries reset time)
//!     → body loader + InputValidator → InvalidInput (carries quota)
//!     → Admission { quota, payload }
//! ```
//!
//! # Design Decisions
//! - Rate limiting runs before input validation so malformed payloads still spend quota
//! - No stage runs after a rejection

pub mod outcome;
pub mod pipeline;

pub use outcome::{Admission, AdmissionResult, Rejection, RejectionReason};
pub use pipeline::AdmissionPipeline;
