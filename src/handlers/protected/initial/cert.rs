// handlers/protected/initial/cert.rs - Terminal certificate handlers

use axum::{
    extract::{OriginalUri, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::audit;
use crate::auth::Principal;
use crate::database::models::{Terminal, TerminalPatch};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::NewTerminal;
use crate::state::AppState;
use crate::types::{EntityLevel, Operation};

#[derive(Debug, Deserialize)]
pub struct CertListing {
    pub intermediate: Uuid,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// GET /initial/find/cert?intermediate=
pub async fn find_all(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(listing): Query<CertListing>,
) -> ApiResult<Vec<Terminal>> {
    let page = state.page(listing.skip, listing.limit);
    let records = state
        .services
        .directory
        .list_terminals(&principal, listing.intermediate, page)
        .await?;
    Ok(ApiResponse::success(records.into_iter().map(Terminal::redacted).collect()))
}

/// GET /initial/find/cert/:id
pub async fn find_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Terminal> {
    let record = state.services.directory.terminal(&principal, id).await?;
    Ok(ApiResponse::success(record.redacted()))
}

/// POST /initial/issue/cert - consumes one unit of certificate quota
pub async fn issue(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Json(request): Json<NewTerminal>,
) -> ApiResult<Terminal> {
    let record = state.services.lifecycle.issue_terminal(&principal, request).await?.redacted();
    audit(&state, "POST", &uri, Operation::Issue, &record, &principal).await;
    Ok(ApiResponse::created(record))
}

/// PUT /initial/solve/cert/:id - owner or organization Admin
pub async fn solve(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
    Json(patch): Json<TerminalPatch>,
) -> ApiResult<Terminal> {
    let record = state.services.lifecycle.update_terminal(&principal, id, patch).await?.redacted();
    audit(&state, "PUT", &uri, Operation::Update, &record, &principal).await;
    Ok(ApiResponse::success(record))
}

/// DELETE /initial/purge/cert/:id
pub async fn purge(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.services.lifecycle.revoke(&principal, EntityLevel::Terminal, id).await?;
    let body = json!({"id": id, "revoked": true});
    audit(&state, "DELETE", &uri, Operation::Revoke, &body, &principal).await;
    Ok(ApiResponse::success(body))
}
