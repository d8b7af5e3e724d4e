// handlers/protected/initial/company.rs - Organization handlers (Super Admin)

use axum::{
    extract::{OriginalUri, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::audit;
use crate::auth::Principal;
use crate::database::models::{Organization, OrganizationPatch, QuotaKind};
use crate::handlers::protected::Window;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::NewOrganization;
use crate::state::AppState;
use crate::types::{EntityLevel, Operation};

#[derive(Debug, Deserialize)]
pub struct QuotaGrant {
    pub kind: QuotaKind,
    pub amount: i64,
}

/// GET /initial/find/company - active organizations
pub async fn find_all(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(window): Query<Window>,
) -> ApiResult<Vec<Organization>> {
    let page = state.page(window.skip, window.limit);
    let orgs = state.services.directory.list_organizations(&principal, page).await?;
    Ok(ApiResponse::success(orgs.into_iter().map(Organization::redacted).collect()))
}

/// GET /initial/find/company/:id
pub async fn find_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Organization> {
    let org = state.services.directory.organization(&principal, id).await?;
    Ok(ApiResponse::success(org.redacted()))
}

/// POST /initial/issue/company
pub async fn issue(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Json(request): Json<NewOrganization>,
) -> ApiResult<Organization> {
    let org = state.services.lifecycle.issue_organization(&principal, request).await?.redacted();
    audit(&state, "POST", &uri, Operation::Issue, &org, &principal).await;
    Ok(ApiResponse::created(org))
}

/// PUT /initial/solve/company/:id
pub async fn solve(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
    Json(patch): Json<OrganizationPatch>,
) -> ApiResult<Organization> {
    let org = state.services.lifecycle.update_organization(&principal, id, patch).await?.redacted();
    audit(&state, "PUT", &uri, Operation::Update, &org, &principal).await;
    Ok(ApiResponse::success(org))
}

/// PUT /initial/solve/company/:id/quota
pub async fn grant_quota(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
    Json(grant): Json<QuotaGrant>,
) -> ApiResult<Organization> {
    let org = state
        .services
        .lifecycle
        .grant_quota(&principal, id, grant.kind, grant.amount)
        .await?
        .redacted();
    audit(&state, "PUT", &uri, Operation::Grant, &json!({"id": id, "kind": grant.kind, "amount": grant.amount}), &principal)
        .await;
    Ok(ApiResponse::success(org))
}

/// DELETE /initial/purge/company/:id - children are left in place
pub async fn purge(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.lifecycle.revoke(&principal, EntityLevel::Organization, id).await?;
    let body = json!({"id": id, "revoked": true});
    audit(&state, "DELETE", &uri, Operation::Revoke, &body, &principal).await;
    Ok(ApiResponse::success(body))
}
