//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound fetch or CPU-bound utility call:
//!     → timeouts.rs (hard deadline, cancelled on expiry)
//!     → caller maps DeadlineExceeded to a client-visible timeout
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No automatic retries: retry policy belongs to the caller

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineExceeded};
