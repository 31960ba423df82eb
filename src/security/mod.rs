//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming gated request:
//!     → fingerprint.rs (who is asking)
//!     → credentials.rs (shared-secret check)
//!     → rate_limit.rs → window.rs (per-client fixed window)
//!     → egress.rs / pattern.rs (used by input validation)
//!     → Pass to the endpoint handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input, including forwarded headers unless configured
//! - All shared state (the counter table) is owned and injectable, never global

pub mod clock;
pub mod credentials;
pub mod egress;
pub mod fingerprint;
pub mod headers;
pub mod pattern;
pub mod rate_limit;
pub mod sweep;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialPolicy, CredentialValidator};
pub use egress::{EgressPolicy, EgressViolation, GuardedResolver};
pub use fingerprint::{Fingerprint, FingerprintExtractor};
pub use pattern::{PatternBudget, PatternViolation};
pub use rate_limit::{Quota, RateLimitExceeded, RateLimiter};
pub use sweep::SweepService;
pub use window::{WindowCounter, WindowDecision};
