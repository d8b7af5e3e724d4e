// handlers/protected/auth/member.rs - PUT /jwt/auth/users/:username handler

use axum::{
    extract::{OriginalUri, Path, State},
    Extension, Json,
};
use serde_json::json;

use crate::auth::Principal;
use crate::database::models::{PrincipalPatch, User};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::Operation;

pub async fn member_put(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(username): Path<String>,
    Json(patch): Json<PrincipalPatch>,
) -> ApiResult<User> {
    let user = state.services.accounts.update_member(&principal, &username, patch).await?;
    state
        .services
        .audit
        .record(
            "PUT",
            uri.path(),
            Operation::Update,
            json!({
                "username": user.username,
                "role": user.role,
                "disabled": user.disabled,
                "organization_token": user.organization_token,
            }),
            Some(&principal),
        )
        .await;
    Ok(ApiResponse::success(user))
}
