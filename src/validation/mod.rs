//! Input validation subsystem.
//!
//! # Data Flow
//! ```text
//! RawPayload (JSON bytes | query map | multipart parts)
//!     → schema.rs (ordered field declarations per endpoint)
//!     → validator.rs (type check, bounds, egress + pattern policy)
//!     → sanitize.rs (control chars, filenames)
//!     → TypedPayload handed to the utility
//! ```
//!
//! # Design Decisions
//! - Fail fast: the first failing field is the only one reported
//! - Unknown fields are ignored
//! - Schemas are built once at startup and never mutated

pub mod sanitize;
pub mod schema;
pub mod validator;

pub use schema::{EndpointId, EndpointSchema, FieldKind, FieldSpec};
pub use validator::{FieldError, InputValidator, RawPayload, TypedPayload, Upload, ValidatedFile};
