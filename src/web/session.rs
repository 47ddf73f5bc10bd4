use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::future::Future;

use crate::app::AppState;
use crate::repos::TokenError;
use crate::web::error::ApiError;

/// Extractor for platform calls that must carry `Authorization: Bearer <token>`.
///
/// ```ignore
/// async fn handler(BearerUser { user_id }: BearerUser) -> impl IntoResponse {
///     format!("User: {}", user_id)
/// }
/// ```
pub struct BearerUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for BearerUser {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let token = bearer_token(parts);
        async move {
            let Some(token) = token else {
                return Err(ApiError::Unauthorized("missing bearer token"));
            };
            match state.tokens.resolve_access(&token).await {
                Ok(user_id) => Ok(BearerUser { user_id }),
                Err(TokenError::Expired) => Err(ApiError::Unauthorized("access token expired")),
                Err(TokenError::NotFound) => Err(ApiError::Unauthorized("invalid access token")),
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
