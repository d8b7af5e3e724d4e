// HTTP API Error Types
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::auth::{AuthError, DenyReason};
use crate::database::StoreError;
use crate::services::CoreError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity
    UnprocessableEntity(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::UnprocessableEntity(_) => 422,
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::MissingScope => ApiError::unauthorized(reason.message()),
            _ => ApiError::forbidden(reason.message()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        // Don't expose store internals to clients
        tracing::error!("Store error: {}", err);
        ApiError::service_unavailable("Database temporarily unavailable")
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthenticated => ApiError::unauthorized(err.to_string()),
            CoreError::Denied(reason) => reason.into(),
            CoreError::UnknownUser
            | CoreError::ParentInactive(_)
            | CoreError::PersonalIntermediate
            | CoreError::QuotaExhausted(_) => ApiError::bad_request(err.to_string()),
            CoreError::WrongPassword => ApiError::forbidden(err.to_string()),
            CoreError::ParentNotFound(_) | CoreError::NotFound(_) => ApiError::not_found(err.to_string()),
            CoreError::DuplicateSubject(_) | CoreError::InvalidTransition(_) => ApiError::Conflict(err.to_string()),
            CoreError::InvalidInput(msg) => ApiError::unprocessable_entity(msg),
            CoreError::StoreUnavailable(store) => store.into(),
            CoreError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(_) => ApiError::unauthorized("Could not validate credentials"),
            AuthError::MissingCsrf => ApiError::bad_request(err.to_string()),
            AuthError::InvalidCsrf => ApiError::unauthorized(err.to_string()),
            other => {
                tracing::error!("Auth error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.to_json())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::QuotaKind;
    use crate::types::EntityLevel;

    fn status(err: CoreError) -> u16 {
        ApiError::from(err).status_code()
    }

    #[test]
    fn core_errors_map_to_statuses() {
        assert_eq!(status(CoreError::DuplicateSubject("HR".into())), 409);
        assert_eq!(status(CoreError::ParentNotFound(EntityLevel::Organization)), 404);
        assert_eq!(status(CoreError::ParentInactive(EntityLevel::Intermediate)), 400);
        assert_eq!(status(CoreError::QuotaExhausted(QuotaKind::Signing)), 400);
        assert_eq!(status(CoreError::Denied(DenyReason::MissingScope)), 401);
        assert_eq!(status(CoreError::Denied(DenyReason::Expired)), 403);
        assert_eq!(status(CoreError::Denied(DenyReason::OutsideOrganization)), 403);
        assert_eq!(status(CoreError::Unauthenticated), 401);
        assert_eq!(status(CoreError::UnknownUser), 400);
        assert_eq!(status(CoreError::WrongPassword), 403);
        assert_eq!(status(CoreError::InvalidInput("bad".into())), 422);
        assert_eq!(status(CoreError::InvalidTransition("no".into())), 409);
        assert_eq!(status(CoreError::StoreUnavailable(StoreError::Unavailable("down".into()))), 503);
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let response = ApiError::unauthorized("nope").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn body_uses_failure_envelope() {
        let body = ApiError::from(CoreError::Denied(DenyReason::Disabled)).to_json();
        assert_eq!(body, json!({"success": false, "error": "Inactive user", "code": "FORBIDDEN"}));
    }
}
