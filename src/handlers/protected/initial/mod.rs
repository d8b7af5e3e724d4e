// handlers/protected/initial/mod.rs - Certificate hierarchy endpoints
//
// find  → reads, issue → create, solve → update, purge → revoke.
// Every record leaves through `redacted()` so signer and subject passwords
// never reach a response body or the transaction log.

use axum::http::Uri;
use serde::Serialize;
use serde_json::Value;

use crate::auth::Principal;
use crate::state::AppState;
use crate::types::Operation;

pub mod cert; // /initial/{find,issue,solve,purge}/cert
pub mod company; // /initial/{find,issue,solve,purge}/company
pub mod level; // /initial/{find,issue,solve,purge}/level

pub(crate) async fn audit<T: Serialize>(
    state: &AppState,
    method: &str,
    uri: &Uri,
    operation: Operation,
    record: &T,
    principal: &Principal,
) {
    let payload = serde_json::to_value(record).unwrap_or(Value::Null);
    state
        .services
        .audit
        .record(method, uri.path(), operation, payload, Some(principal))
        .await;
}
