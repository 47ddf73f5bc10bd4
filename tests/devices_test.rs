use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use time::Duration;

#[path = "common.rs"]
mod common;

fn set_on_off(device_id: &str, value: serde_json::Value) -> serde_json::Value {
    json!({
        "payload": {
            "devices": [{
                "id": device_id,
                "capabilities": [{
                    "type": "devices.capabilities.on_off",
                    "state": {"instance": "on", "value": value}
                }]
            }]
        }
    })
}

#[tokio::test]
async fn device_endpoints_require_bearer() {
    let app = common::test_app();
    for (method, uri) in [
        ("GET", "/v1.0/user/devices"),
        ("POST", "/v1.0/user/devices/query"),
        ("POST", "/v1.0/user/devices/action"),
        ("GET", "/user/info"),
    ] {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let res = common::send(&app.router, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }

    let res = common::send(&app.router, common::bearer_get("/v1.0/user/devices", "not-a-token")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn discovery_lists_user_devices() {
    let app = common::test_app();
    let token = common::access_token_for(&app.router, "user-1").await;

    let req = Request::get("/v1.0/user/devices")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header("X-Request-Id", "req-42")
        .body(Body::empty())
        .unwrap();
    let res = common::send(&app.router, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::body_json(res).await;

    assert_eq!(body["request_id"], "req-42");
    assert_eq!(body["payload"]["user_id"], "user-1");
    let devices = body["payload"]["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["id"], "relay_1");
    assert_eq!(devices[0]["type"], "devices.types.switch");
    assert_eq!(devices[0]["capabilities"][0]["type"], "devices.capabilities.on_off");
}

#[tokio::test]
async fn discovery_generates_request_id() {
    let app = common::test_app();
    let token = common::access_token_for(&app.router, "user-1").await;
    let res = common::send(&app.router, common::bearer_get("/v1.0/user/devices", &token)).await;
    let body = common::body_json(res).await;
    assert!(uuid::Uuid::parse_str(body["request_id"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn action_then_query_reflects_new_state() {
    let app = common::test_app();
    let token = common::access_token_for(&app.router, "user-1").await;

    let res = common::send(
        &app.router,
        common::bearer_post_json("/v1.0/user/devices/query", &token, &json!({"devices": [{"id": "relay_1"}]})),
    )
    .await;
    let body = common::body_json(res).await;
    assert_eq!(body["payload"]["devices"][0]["capabilities"][0]["state"]["value"], false);

    let res = common::send(
        &app.router,
        common::bearer_post_json("/v1.0/user/devices/action", &token, &set_on_off("relay_1", json!(true))),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::body_json(res).await;
    let cap = &body["payload"]["devices"][0]["capabilities"][0];
    assert_eq!(body["payload"]["devices"][0]["id"], "relay_1");
    assert_eq!(cap["type"], "devices.capabilities.on_off");
    assert_eq!(cap["state"]["instance"], "on");
    assert_eq!(cap["state"]["action_result"], json!({"status": "DONE"}));

    let res = common::send(
        &app.router,
        common::bearer_post_json("/v1.0/user/devices/query", &token, &json!({"devices": [{"id": "relay_1"}]})),
    )
    .await;
    let body = common::body_json(res).await;
    assert_eq!(
        body["payload"]["devices"][0]["capabilities"][0]["state"],
        json!({"instance": "on", "value": true})
    );
}

#[tokio::test]
async fn device_state_is_per_user() {
    let app = common::test_app();
    let alice = common::access_token_for(&app.router, "alice").await;
    let bob = common::access_token_for(&app.router, "bob").await;

    common::send(
        &app.router,
        common::bearer_post_json("/v1.0/user/devices/action", &alice, &set_on_off("relay_1", json!(true))),
    )
    .await;

    let res = common::send(
        &app.router,
        common::bearer_post_json("/v1.0/user/devices/query", &bob, &json!({"devices": [{"id": "relay_1"}]})),
    )
    .await;
    let body = common::body_json(res).await;
    assert_eq!(body["payload"]["devices"][0]["capabilities"][0]["state"]["value"], false);
}

#[tokio::test]
async fn query_omits_unknown_devices() {
    let app = common::test_app();
    let token = common::access_token_for(&app.router, "user-1").await;
    let res = common::send(
        &app.router,
        common::bearer_post_json(
            "/v1.0/user/devices/query",
            &token,
            &json!({"devices": [{"id": "ghost"}, {"id": "relay_1"}]}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let devices = common::body_json(res).await["payload"]["devices"].as_array().unwrap().clone();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["id"], "relay_1");
}

#[tokio::test]
async fn action_reports_per_capability_errors() {
    let app = common::test_app();
    let token = common::access_token_for(&app.router, "user-1").await;

    let res = common::send(
        &app.router,
        common::bearer_post_json("/v1.0/user/devices/action", &token, &set_on_off("ghost", json!(true))),
    )
    .await;
    let body = common::body_json(res).await;
    assert_eq!(body["payload"]["devices"][0]["id"], "ghost");
    assert_eq!(
        body["payload"]["devices"][0]["capabilities"][0]["state"]["action_result"],
        json!({"status": "ERROR", "error_code": "DEVICE_NOT_FOUND"})
    );

    let res = common::send(
        &app.router,
        common::bearer_post_json("/v1.0/user/devices/action", &token, &set_on_off("relay_1", json!("yes"))),
    )
    .await;
    let body = common::body_json(res).await;
    assert_eq!(
        body["payload"]["devices"][0]["capabilities"][0]["state"]["action_result"]["error_code"],
        "INVALID_VALUE"
    );

    let unsupported = json!({
        "payload": {"devices": [{
            "id": "relay_1",
            "capabilities": [{"type": "devices.capabilities.range", "state": {"instance": "brightness", "value": 50}}]
        }]}
    });
    let res = common::send(
        &app.router,
        common::bearer_post_json("/v1.0/user/devices/action", &token, &unsupported),
    )
    .await;
    let body = common::body_json(res).await;
    let cap = &body["payload"]["devices"][0]["capabilities"][0];
    assert_eq!(cap["type"], "devices.capabilities.range");
    assert_eq!(cap["state"]["instance"], "brightness");
    assert_eq!(cap["state"]["action_result"]["error_code"], "NOT_SUPPORTED");

    // failed actions leave the state untouched
    let res = common::send(
        &app.router,
        common::bearer_post_json("/v1.0/user/devices/query", &token, &json!({"devices": [{"id": "relay_1"}]})),
    )
    .await;
    let body = common::body_json(res).await;
    assert_eq!(body["payload"]["devices"][0]["capabilities"][0]["state"]["value"], false);
}

#[tokio::test]
async fn user_info_and_unlink() {
    let app = common::test_app();
    let token = common::access_token_for(&app.router, "user-1").await;

    let res = common::send(&app.router, common::bearer_get("/user/info", &token)).await;
    assert_eq!(common::body_json(res).await, json!({"user_id": "user-1"}));

    let req = Request::post("/v1.0/user/unlink")
        .header(header::AUTHORIZATION, format!("bearer {}", token))
        .header("X-Request-Id", "unlink-1")
        .body(Body::empty())
        .unwrap();
    let res = common::send(&app.router, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = common::body_json(res).await;
    assert_eq!(body["request_id"], "unlink-1");
    assert_eq!(body["status"], "ok");

    // unlinking does not revoke the token
    let res = common::send(&app.router, common::bearer_get("/user/info", &token)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_access_token_is_rejected() {
    let app = common::test_app();
    let token = common::access_token_for(&app.router, "user-1").await;
    app.clock.advance(Duration::seconds(3601));

    let res = common::send(&app.router, common::bearer_get("/v1.0/user/devices", &token)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(common::body_json(res).await["error"], "access token expired");
}

#[tokio::test]
async fn malformed_json_body_gets_json_error() {
    let app = common::test_app();
    let token = common::access_token_for(&app.router, "user-1").await;
    let req = Request::post("/v1.0/user/devices/action")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = common::send(&app.router, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(res).await;
    assert_eq!(body["error"], "invalid_request");
    assert!(body["error_description"].is_string());
}
