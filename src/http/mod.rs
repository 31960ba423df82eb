//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (router, tower-http layers)
//!     → request.rs (request id)
//!     → middleware/admission.rs (credential → rate limit → body + validation)
//!     → handlers.rs (utility execution)
//!     → response.rs (error envelope, quota headers)
//! ```
//!
//! # Design Decisions
//! - Liveness routes sit outside the admission gate
//! - Request id assigned before tracing so every log line carries it
//! - Unknown routes are plain 404s, never counted against a client

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer, ServerError};
