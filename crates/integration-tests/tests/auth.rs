//! Integration tests for health checks and account flows.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API server running (cargo run -p techmart-api)

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;

use techmart_integration_tests::{TestClient, data, error, unique_email, url};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_health_and_readiness() {
    let client = reqwest::Client::new();

    let live = client.get(url("/health")).send().await.unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    assert!(live.headers().contains_key("x-request-id"));

    let ready = client.get(url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_register_login_and_me() {
    let anon = TestClient::anonymous();
    let email = unique_email("login");

    let resp = anon
        .post("/api/auth/register")
        .json(&json!({ "name": "Tran Thi B", "email": email, "password": "Secret-pass-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let session = data(resp).await;
    assert_eq!(session["user"]["role"], "customer");
    assert!(session["user"].get("password_hash").is_none());

    let resp = anon
        .post("/api/auth/login")
        .json(&json!({ "email": email.to_uppercase(), "password": "Secret-pass-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let token = data(resp).await["token"].as_str().unwrap().to_owned();

    let me = anon
        .get("/api/auth/me")
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(data(me).await["email"], email);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_registration_conflicts() {
    let anon = TestClient::anonymous();
    let email = unique_email("dup");
    let body = json!({ "name": "Dup", "email": email, "password": "Secret-pass-1" });

    let first = anon.post("/api/auth/register").json(&body).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = anon.post("/api/auth/register").json(&body).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_wrong_password_is_unauthorized() {
    let anon = TestClient::anonymous();
    let resp = anon
        .post("/api/auth/login")
        .json(&json!({ "email": unique_email("nobody"), "password": "Wrong-pass-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(!error(resp).await.is_empty());
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_forgot_password_does_not_reveal_accounts() {
    let anon = TestClient::anonymous();
    let resp = anon
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": unique_email("ghost") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_customer_cannot_reach_admin() {
    let customer = TestClient::customer().await;
    let resp = customer.get("/api/admin/dashboard").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let anon = TestClient::anonymous();
    let resp = anon.get("/api/admin/dashboard").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
