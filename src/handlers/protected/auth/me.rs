// handlers/protected/auth/me.rs - Profile and status of the calling principal

use axum::{extract::State, Extension};
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::Principal;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Requires scope `me` and an enabled account
pub async fn users_me_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Principal> {
    let principal = state.services.accounts.current_profile(&principal)?;
    Ok(ApiResponse::success(principal.clone()))
}

/// Any valid token
pub async fn status_get(Extension(principal): Extension<Principal>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "username": principal.username,
        "role": principal.role,
        "scopes": principal.scopes,
        "disabled": principal.disabled,
        "expired": principal.is_expired(Utc::now()),
    })))
}
