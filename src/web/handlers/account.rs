use axum::{http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::web::{handlers::devices::request_id, session::BearerUser};

/// Lets the platform check which account a token belongs to.
pub async fn user_info(BearerUser { user_id }: BearerUser) -> Json<Value> {
    Json(json!({ "user_id": user_id }))
}

// Tokens and device state stay in place; the platform simply stops calling.
pub async fn unlink(BearerUser { user_id }: BearerUser, headers: HeaderMap) -> Json<Value> {
    tracing::info!(user_id = %user_id, "account unlinked by platform");
    Json(json!({ "request_id": request_id(&headers), "status": "ok" }))
}
