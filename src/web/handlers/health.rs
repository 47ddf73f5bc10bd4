use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { ok: true }))
}

/// `/v1.0` and `/v1.0/health`; the platform probes the former with HEAD.
pub async fn status() -> impl IntoResponse {
    (StatusCode::OK, Json(StatusResponse { status: "ok" }))
}
