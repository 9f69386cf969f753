use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TokenIssuer;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::keeper::Keeper;
use crate::storage::Storage;
use crate::AppState;

fn app() -> axum::Router {
    let storage = Arc::new(Storage::in_memory().unwrap());
    let keeper = Keeper::new(storage, b"0123456789abcdef".to_vec());
    let token_issuer = TokenIssuer::new(b"test-secret".to_vec());
    super::router(AppState::new(keeper, token_issuer))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn register_and_login(app: &axum::Router, login: &str) -> String {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v0/auth/registration",
            None,
            json!({"login": login, "password": "pw123"}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v0/auth/login",
            None,
            json!({"login": login, "password": "pw123"}),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn healthz_has_no_auth() {
    let response = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_user_info_round_trip() {
    let app = app();
    let token = register_and_login(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            "/api/v0/user/info",
            Some(&token),
            Value::Null,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_id"], 1);
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let app = app();
    let token = register_and_login(&app, "alice").await;
    let mut tampered = token.clone();
    tampered.push('x');

    let response = app
        .oneshot(json_request(
            "GET",
            "/api/v0/user/info",
            Some(&tampered),
            Value::Null,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_is_conflict() {
    let app = app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v0/auth/registration",
            None,
            json!({"login": "alice", "password": "pw123"}),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v0/auth/registration",
            None,
            json!({"login": "alice", "password": "pw123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_and_fetch_secret_round_trips_plaintext() {
    let app = app();
    let token = register_and_login(&app, "alice").await;

    let plaintext = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        b"hello world",
    );
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v0/user/data",
            Some(&token),
            json!({"title": "note", "data_type": "TEXT", "data": plaintext, "update_dt": 1700000000}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!("/api/v0/user/data/{id}"),
            Some(&token),
            Value::Null,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["data"], plaintext);
}

#[tokio::test]
async fn missing_record_returns_no_content_not_404() {
    let app = app();
    let token = register_and_login(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            "/api/v0/user/data/999",
            Some(&token),
            Value::Null,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(json_request(
            "DELETE",
            "/api/v0/user/data/999",
            Some(&token),
            Value::Null,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
