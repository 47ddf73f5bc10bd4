#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use smarthome_bridge::{
    app::{build_router, AppState},
    clock::ManualClock,
    config::AppConfig,
};
use tower::ServiceExt; // for oneshot

pub const CLIENT_ID: &str = "my-smart-home";
pub const CLIENT_SECRET: &str = "supersecret123";
pub const REDIRECT_URI: &str = "https://social.yandex.net/broker/redirect";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

pub fn test_app() -> TestApp {
    test_app_with(AppConfig::default())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
    let clock = Arc::new(ManualClock::default());
    let state = AppState::with_clock(config, clock.clone());
    TestApp { router: build_router(state.clone()), state, clock }
}

pub async fn send(router: &Router, req: Request<Body>) -> Response {
    router.clone().oneshot(req).await.unwrap()
}

pub async fn body_json(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(res: Response) -> String {
    let bytes = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn form_post(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

pub fn bearer_get(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn bearer_post_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn authorize_uri(user: &str, state: Option<&str>) -> String {
    let mut ser = url::form_urlencoded::Serializer::new(String::new());
    ser.append_pair("client_id", CLIENT_ID)
        .append_pair("redirect_uri", REDIRECT_URI)
        .append_pair("response_type", "code")
        .append_pair("user", user);
    if let Some(s) = state {
        ser.append_pair("state", s);
    }
    format!("/authorize?{}", ser.finish())
}

/// Runs the login step and returns the code from the redirect.
pub async fn authorize_code(router: &Router, user: &str) -> String {
    let res = send(router, Request::get(authorize_uri(user, None)).body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let location = res.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    let url = url::Url::parse(location).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .expect("code in redirect")
}

pub fn code_exchange(code: &str) -> Request<Body> {
    form_post(
        "/token",
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", CLIENT_ID),
            ("client_secret", CLIENT_SECRET),
        ],
    )
}

/// Full account-linking flow; returns the token response body.
pub async fn link_account(router: &Router, user: &str) -> Value {
    let code = authorize_code(router, user).await;
    let res = send(router, code_exchange(&code)).await;
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

pub async fn access_token_for(router: &Router, user: &str) -> String {
    link_account(router, user).await["access_token"].as_str().unwrap().to_string()
}
