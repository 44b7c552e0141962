//! Axum boundary for the portcullis authentication core.
//!
//! Routes translate HTTP requests into orchestrator and use-case calls and
//! translate the structured outcomes back into JSON responses and status
//! codes. No authentication decision lives here: cookies in, cookies out,
//! everything else delegated.

pub mod error;
pub mod routes;

pub use error::{AuthApiError, ErrorResponse};
pub use routes::{PENDING_COOKIE, SESSION_COOKIE};
