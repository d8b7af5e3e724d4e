// handlers/public/auth/csrf_token.rs - GET /jwt/auth/csrftoken handler

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::require_shared_secret;
use crate::auth::CsrfSigner;
use crate::error::ApiError;
use crate::state::AppState;

pub const CSRF_SECRET_HEADER: &str = "csrf-header";

/// Mints a signed token and hands it back only as an HttpOnly cookie; the
/// client echoes it in `x-csrf-token` on state-changing requests.
pub async fn csrf_token_get(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_shared_secret(&headers, CSRF_SECRET_HEADER, &state.config.security.csrf_header)?;
    let token = state.csrf.mint()?;
    Ok((
        [(header::SET_COOKIE, CsrfSigner::cookie_header(&token))],
        Json(json!({"csrf_token": "cookie"})),
    ))
}
