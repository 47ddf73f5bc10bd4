use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors surfaced to HTTP callers. OAuth failures use the RFC 6749 error
/// codes; everything else carries a human-readable message.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed `/authorize` request or an unreadable request body.
    BadRequest(String),
    /// Required token-endpoint parameter missing.
    InvalidRequest(&'static str),
    InvalidClient,
    /// Unknown, expired or already used code / refresh token.
    InvalidGrant,
    UnsupportedGrantType(String),
    /// Missing, unknown or expired bearer token.
    Unauthorized(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error = ?self, "request rejected");

        let (status, body) = match self {
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid_request", "error_description": detail }),
            ),
            ApiError::InvalidRequest(missing) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid_request", "error_description": format!("missing {}", missing) }),
            ),
            ApiError::InvalidClient => (StatusCode::UNAUTHORIZED, json!({ "error": "invalid_client" })),
            ApiError::InvalidGrant => (StatusCode::BAD_REQUEST, json!({ "error": "invalid_grant" })),
            ApiError::UnsupportedGrantType(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "unsupported_grant_type" }),
            ),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, json!({ "error": message })),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
