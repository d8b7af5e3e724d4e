// handlers/public/auth/mod.rs - Public authentication handlers

use axum::http::HeaderMap;

use crate::error::ApiError;

pub mod csrf_token; // GET /jwt/auth/csrftoken
pub mod register; // POST /jwt/auth/register
pub mod token; // POST /jwt/auth/token

pub use csrf_token::csrf_token_get;
pub use register::register_post;
pub use token::token_post;

/// Missing header is a malformed request; a wrong value is an auth failure.
pub(crate) fn require_shared_secret(headers: &HeaderMap, name: &str, expected: &str) -> Result<(), ApiError> {
    let value = headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request(format!("Missing header {}", name)))?;
    if value != expected {
        tracing::warn!("Rejected request with invalid {}", name);
        return Err(ApiError::unauthorized(format!("Invalid header {}", name)));
    }
    Ok(())
}
