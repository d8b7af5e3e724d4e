use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::{bearer_auth_middleware, csrf_middleware, rate_limit_middleware};
use crate::services::CoreResult;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected
        .merge(auth_routes(&state))
        .merge(initial_routes(&state))
        // Global middleware
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(cors_layer(&state.config.security))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/jwt/auth/token", post(auth::token_post))
        .route("/jwt/auth/register", post(auth::register_post))
        .route("/jwt/auth/csrftoken", get(auth::csrf_token_get))
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/jwt/auth/users/me/", get(auth::users_me_get))
        .route("/jwt/auth/status/", get(auth::status_get))
        .route("/jwt/auth/users/:username", put(auth::member_put))
        .route_layer(from_fn_with_state(state.clone(), bearer_auth_middleware))
}

fn initial_routes(state: &AppState) -> Router<AppState> {
    use protected::initial::{cert, company, level};

    Router::new()
        // Organizations
        .route("/initial/find/company", get(company::find_all))
        .route("/initial/find/company/:id", get(company::find_one))
        .route("/initial/issue/company", post(company::issue))
        .route("/initial/solve/company/:id", put(company::solve))
        .route("/initial/solve/company/:id/quota", put(company::grant_quota))
        .route("/initial/purge/company/:id", delete(company::purge))
        // Intermediates
        .route("/initial/find/level", get(level::find_all))
        .route("/initial/find/level/:id", get(level::find_one))
        .route("/initial/issue/level", post(level::issue))
        .route("/initial/solve/level/:id", put(level::solve))
        .route("/initial/purge/level/:id", delete(level::purge))
        // Terminals
        .route("/initial/find/cert", get(cert::find_all))
        .route("/initial/find/cert/:id", get(cert::find_one))
        .route("/initial/issue/cert", post(cert::issue))
        .route("/initial/solve/cert/:id", put(cert::solve))
        .route("/initial/purge/cert/:id", delete(cert::purge))
        // Outermost runs first: CSRF, then bearer auth
        .route_layer(from_fn_with_state(state.clone(), bearer_auth_middleware))
        .route_layer(from_fn_with_state(state.clone(), csrf_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
}

/// Ensure the configured Super Admin exists. No-op without a bootstrap section.
pub async fn bootstrap(state: &AppState) -> CoreResult<()> {
    if let Some(bootstrap) = &state.config.bootstrap {
        let user = state
            .services
            .accounts
            .ensure_super_admin(&bootstrap.username, &bootstrap.password)
            .await?;
        info!("Bootstrap Super Admin '{}' ready", user.username);
    }
    Ok(())
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Signature API (Rust)",
            "version": version,
            "description": "Certificate hierarchy and e-signature management backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/jwt/auth/token, /jwt/auth/register, /jwt/auth/csrftoken (public)",
                "account": "/jwt/auth/users/me/, /jwt/auth/status/, /jwt/auth/users/:username (protected)",
                "company": "/initial/{find,issue,solve,purge}/company (Super Admin)",
                "level": "/initial/{find,issue,solve,purge}/level (Admin)",
                "cert": "/initial/{find,issue,solve,purge}/cert (Member)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE"
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::{AppConfig, Environment};
    use crate::database::MemoryStore;

    fn state_with(config: AppConfig) -> AppState {
        AppState::new(config, Arc::new(MemoryStore::new())).unwrap()
    }

    fn development() -> AppConfig {
        AppConfig::preset(Environment::Development)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(router: &Router, username: &str, password: &str) -> String {
        let response = router
            .clone()
            .oneshot(
                Request::post("/jwt/auth/token")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(format!("username={}&password={}", username, password)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn root_and_health_are_public() {
        let router = app(state_with(development()));

        let response = router.clone().oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["database"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_challenge_without_token() {
        let router = app(state_with(development()));
        let response = router
            .oneshot(Request::get("/jwt/auth/users/me/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn bootstrap_then_token_then_profile() {
        let mut config = development();
        config.bootstrap = Some(crate::config::BootstrapConfig {
            username: "root".to_string(),
            password: "pw".to_string(),
        });
        let state = state_with(config);
        bootstrap(&state).await.unwrap();
        let router = app(state);

        let token = login(&router, "root", "pw").await;
        let response = router
            .oneshot(
                Request::get("/jwt/auth/users/me/")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["username"], "root");
        assert_eq!(body["data"]["role"], "Super Admin");
    }

    #[tokio::test]
    async fn registration_requires_shared_header() {
        let router = app(state_with(development()));
        let request = |secret: Option<&str>| {
            let mut builder = Request::post("/jwt/auth/register").header(header::CONTENT_TYPE, "application/json");
            if let Some(secret) = secret {
                builder = builder.header("jwt-header", secret);
            }
            builder
                .body(Body::from(json!({"username": "kane", "password": "pw"}).to_string()))
                .unwrap()
        };

        let response = router.clone().oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = router.clone().oneshot(request(Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = router.clone().oneshot(request(Some("development-registration"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let response = router.oneshot(request(Some("development-registration"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn enforced_csrf_rejects_mutations_without_cookie() {
        let mut config = development();
        config.security.enforce_csrf = true;
        let router = app(state_with(config));

        let response = router
            .clone()
            .oneshot(
                Request::post("/initial/issue/company")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Missing Cookie csrf-token");

        // Reads are not guarded; they fail on authentication instead
        let response = router
            .oneshot(Request::get("/initial/find/company").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn csrf_cookie_is_minted_behind_header() {
        let router = app(state_with(development()));
        let response = router
            .clone()
            .oneshot(Request::get("/jwt/auth/csrftoken").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(
                Request::get("/jwt/auth/csrftoken")
                    .header("csrf-header", "development-csrf")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.starts_with("csrf-token="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn rate_limit_returns_429() {
        let mut config = development();
        config.api.enable_rate_limiting = true;
        config.api.rate_limit_requests = 2;
        config.api.rate_limit_window_secs = 60;
        let router = app(state_with(config));

        for _ in 0..2 {
            let response = router.clone().oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = router.oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
