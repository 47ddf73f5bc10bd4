use axum::{
    extract::{rejection::FormRejection, Form, Query, State},
    http::{header::{AUTHORIZATION, LOCATION}, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    app::AppState,
    models::token::TokenPair,
    security::{credentials_match, decode_basic_credentials},
    web::error::ApiError,
};

const TOKEN_SCOPE: &str = "devices";

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub state: Option<String>,
    /// Demo login: the username typed into the form.
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token_type: &'static str,
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: &'static str,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            token_type: "bearer",
            access_token: pair.access_token,
            expires_in: pair.expires_in,
            refresh_token: pair.refresh_token,
            scope: TOKEN_SCOPE,
        }
    }
}

pub async fn authorize(
    State(state): State<AppState>,
    Query(q): Query<AuthorizeQuery>,
) -> Result<Response, ApiError> {
    let client_id = q.client_id.as_deref().unwrap_or_default();
    if client_id != state.config.oauth.client_id {
        return Err(ApiError::BadRequest("unknown client_id".into()));
    }
    let response_type = q.response_type.as_deref().unwrap_or("code");
    if response_type != "code" {
        return Err(ApiError::BadRequest(format!("unsupported response_type '{}'", response_type)));
    }
    let redirect_uri = match q.redirect_uri.as_deref() {
        Some(uri) if !uri.is_empty() => uri,
        _ => return Err(ApiError::BadRequest("redirect_uri is required".into())),
    };
    let redirect_url = Url::parse(redirect_uri)
        .map_err(|_| ApiError::BadRequest("redirect_uri must be an absolute URL".into()))?;
    let allowed = &state.config.oauth.allowed_redirect_uris;
    if !allowed.is_empty() && !allowed.iter().any(|a| a == redirect_uri) {
        return Err(ApiError::BadRequest("redirect_uri is not allowed".into()));
    }

    let user = q.user.as_deref().map(str::trim).unwrap_or_default();
    if user.is_empty() {
        return Ok(Html(render_login_page(client_id, redirect_uri, q.state.as_deref())).into_response());
    }

    let code = state.tokens.issue_code(user, client_id, redirect_uri).await;
    tracing::info!(user_id = %user, "issued authorization code");

    let mut params = vec![("code", code)];
    if let Some(s) = q.state.filter(|s| !s.is_empty()) {
        params.push(("state", s));
    }
    Ok(build_redirect_response(redirect_url, &params))
}

pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Form(req) = body?;
    authenticate_client(&state, &headers, req.client_id.as_deref(), req.client_secret.as_deref())?;

    let grant_type = req.grant_type.as_deref().unwrap_or_default();
    let pair = match grant_type {
        "authorization_code" => exchange_code(&state, &req).await?,
        "refresh_token" => refresh_grant(&state, req.refresh_token.as_deref()).await?,
        other => return Err(ApiError::UnsupportedGrantType(other.to_string())),
    };
    Ok(Json(pair.into()))
}

/// Dedicated refresh endpoint; `grant_type` may be omitted.
pub async fn token_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Form(req) = body?;
    authenticate_client(&state, &headers, req.client_id.as_deref(), req.client_secret.as_deref())?;
    let pair = refresh_grant(&state, req.refresh_token.as_deref()).await?;
    Ok(Json(pair.into()))
}

async fn exchange_code(state: &AppState, req: &TokenRequest) -> Result<TokenPair, ApiError> {
    let code = req
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::InvalidRequest("code"))?;

    let row = state.tokens.consume_code(code).await.map_err(|e| {
        tracing::warn!(error = %e, "authorization code rejected");
        ApiError::InvalidGrant
    })?;

    if row.client_id != state.config.oauth.client_id {
        return Err(ApiError::InvalidGrant);
    }
    if let Some(uri) = req.redirect_uri.as_deref() {
        if uri != row.redirect_uri {
            return Err(ApiError::InvalidGrant);
        }
    }

    state.devices.ensure_user(&row.user_id).await;
    let pair = state.tokens.issue_tokens(&row.user_id, &row.client_id).await;
    tracing::info!(user_id = %row.user_id, "exchanged authorization code for tokens");
    Ok(pair)
}

async fn refresh_grant(state: &AppState, refresh_token: Option<&str>) -> Result<TokenPair, ApiError> {
    let refresh_token = refresh_token
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::InvalidRequest("refresh_token"))?;

    state.tokens.refresh(refresh_token).await.map_err(|e| {
        tracing::warn!(error = %e, "refresh token rejected");
        ApiError::InvalidGrant
    })
}

fn authenticate_client(
    state: &AppState,
    headers: &HeaderMap,
    form_client_id: Option<&str>,
    form_client_secret: Option<&str>,
) -> Result<(), ApiError> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(decode_basic_credentials);

    let (client_id, client_secret) = match from_header {
        Some((id, secret)) => (id, secret),
        None => (
            form_client_id.unwrap_or_default().to_string(),
            form_client_secret.unwrap_or_default().to_string(),
        ),
    };

    let oauth = &state.config.oauth;
    // both comparisons always run
    let id_ok = credentials_match(&oauth.client_id, &client_id);
    let secret_ok = credentials_match(&oauth.client_secret, &client_secret);
    if !(id_ok && secret_ok) {
        return Err(ApiError::InvalidClient);
    }
    Ok(())
}

fn build_redirect_response(mut url: Url, params: &[(&str, String)]) -> Response {
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k, v);
        }
    }
    (StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response()
}

fn render_login_page(client_id: &str, redirect_uri: &str, state: Option<&str>) -> String {
    let client_id = escape_html(client_id);
    let redirect_uri = escape_html(redirect_uri);
    let state = escape_html(state.unwrap_or_default());

    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <title>Link your devices</title>
</head>
<body style="font-family: sans-serif">
  <h2>Sign in to your device account</h2>
  <form method="get" action="/authorize">
    <input type="hidden" name="client_id" value="{client_id}" />
    <input type="hidden" name="redirect_uri" value="{redirect_uri}" />
    <input type="hidden" name="state" value="{state}" />
    <input type="hidden" name="response_type" value="code" />
    <label>Username:</label>
    <input name="user" placeholder="user-1" required />
    <button type="submit">Sign in and link</button>
  </form>
</body>
</html>"#
    )
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
