use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::auth::csrf::{CSRF_COOKIE, CSRF_HEADER};
use crate::error::ApiError;
use crate::state::AppState;

/// Double-submit check for state-changing requests. Safe methods pass
/// through, as does everything when enforcement is off.
pub async fn csrf_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.security.enforce_csrf && mutates(request.method()) {
        let headers = request.headers();
        let cookie = cookie_value(headers, CSRF_COOKIE);
        let header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
        if let Err(e) = state.csrf.verify_pair(cookie.as_deref(), header) {
            tracing::warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
            return Err(e.into());
        }
    }
    Ok(next.run(request).await)
}

fn mutates(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
