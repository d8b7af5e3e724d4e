// handlers/public/auth/register.rs - POST /jwt/auth/register handler

use axum::{
    extract::{OriginalUri, State},
    http::HeaderMap,
    Json,
};
use serde_json::json;

use super::require_shared_secret;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Registration;
use crate::state::AppState;
use crate::types::Operation;

pub const REGISTRATION_HEADER: &str = "jwt-header";

/// New accounts are enabled Members with no organization.
pub async fn register_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(registration): Json<Registration>,
) -> ApiResult<User> {
    require_shared_secret(&headers, REGISTRATION_HEADER, &state.config.security.registration_header)?;

    let user = state.services.accounts.register(registration).await?;
    state
        .services
        .audit
        .record(
            "POST",
            uri.path(),
            Operation::Register,
            json!({"username": user.username, "email": user.email, "full_name": user.full_name}),
            None,
        )
        .await;
    Ok(ApiResponse::created(user))
}
