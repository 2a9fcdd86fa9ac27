//! # API Route Handlers
//!
//! `general` holds the liveness endpoints; `extract` holds the three
//! extraction endpoints.

pub mod extract;
pub mod general;

pub use extract::*;
pub use general::*;

// Shared items used by multiple handler modules.
use super::{errors::AppError, state::AppState, types::ApiResponse};
use aichart::Domain;
use axum::Json;

/// Wraps a successful result in the standard `ApiResponse` envelope.
pub(crate) fn wrap_response<T>(result: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { result })
}

/// Parses a domain name from a request, rejecting unknown names as a bad request.
pub(crate) fn parse_domain(raw: &str) -> Result<Domain, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown domain '{raw}'.")))
}
