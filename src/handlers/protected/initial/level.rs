// handlers/protected/initial/level.rs - Intermediate handlers

use axum::{
    extract::{OriginalUri, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::audit;
use crate::auth::Principal;
use crate::database::models::{Intermediate, IntermediatePatch};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::NewIntermediate;
use crate::state::AppState;
use crate::types::{EntityLevel, Operation};

#[derive(Debug, Default, Deserialize)]
pub struct LevelListing {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// GET /initial/find/level?organization= - defaults to the caller's organization
pub async fn find_all(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(listing): Query<LevelListing>,
) -> ApiResult<Vec<Intermediate>> {
    let page = state.page(listing.skip, listing.limit);
    let records = state
        .services
        .directory
        .list_intermediates(&principal, listing.organization, page)
        .await?;
    Ok(ApiResponse::success(records.into_iter().map(Intermediate::redacted).collect()))
}

/// GET /initial/find/level/:id
pub async fn find_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Intermediate> {
    let record = state.services.directory.intermediate(&principal, id).await?;
    Ok(ApiResponse::success(record.redacted()))
}

/// POST /initial/issue/level - consumes one unit of signing quota
pub async fn issue(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Json(request): Json<NewIntermediate>,
) -> ApiResult<Intermediate> {
    let record = state.services.lifecycle.issue_intermediate(&principal, request).await?.redacted();
    audit(&state, "POST", &uri, Operation::Issue, &record, &principal).await;
    Ok(ApiResponse::created(record))
}

/// PUT /initial/solve/level/:id
pub async fn solve(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
    Json(patch): Json<IntermediatePatch>,
) -> ApiResult<Intermediate> {
    let record = state.services.lifecycle.update_intermediate(&principal, id, patch).await?.redacted();
    audit(&state, "PUT", &uri, Operation::Update, &record, &principal).await;
    Ok(ApiResponse::success(record))
}

/// DELETE /initial/purge/level/:id
pub async fn purge(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.services.lifecycle.revoke(&principal, EntityLevel::Intermediate, id).await?;
    let body = json!({"id": id, "revoked": true});
    audit(&state, "DELETE", &uri, Operation::Revoke, &body, &principal).await;
    Ok(ApiResponse::success(body))
}
