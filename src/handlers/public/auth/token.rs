// handlers/public/auth/token.rs - POST /jwt/auth/token handler
//
// OAuth2 password flow: form fields `username`, `password` and an optional
// space separated `scope`. The body is the bare token object OAuth2 clients
// expect, not the success envelope.

use axum::{extract::State, Form, Json};
use serde::Deserialize;

use crate::error::ApiError;
use crate::services::TokenResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub scope: Option<String>,
}

pub async fn token_post(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .services
        .accounts
        .login(&form.username, &form.password, form.scope.as_deref())
        .await?;
    Ok(Json(token))
}
