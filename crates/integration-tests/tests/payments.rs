//! Integration tests for the MoMo IPN webhook.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API server running (cargo run -p techmart-api)
//! - `TECHMART_ADMIN_EMAIL` / `TECHMART_ADMIN_PASSWORD` for an admin account

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;

use techmart_integration_tests::{TestClient, checkout_body, create_product, data};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_forged_ipn_does_not_mark_paid() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 1_000_000, 5).await;
    let customer = TestClient::customer().await;

    let order = data(
        customer
            .post("/api/orders")
            .json(&checkout_body(product_id, 1))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let order_id = order["id"].as_i64().unwrap();

    let anon = TestClient::anonymous();
    let resp = anon
        .post("/api/payments/momo/ipn")
        .json(&json!({
            "partnerCode": "MOMO",
            "orderId": format!("TM{order_id}_1700000000000"),
            "requestId": "forged",
            "amount": 1_000_000,
            "orderInfo": "forged",
            "orderType": "momo_wallet",
            "transId": 4_000_000_001_i64,
            "resultCode": 0,
            "message": "Successful.",
            "payType": "qr",
            "responseTime": 1_700_000_000_000_i64,
            "extraData": "",
            "signature": "0".repeat(64),
        }))
        .send()
        .await
        .unwrap();
    // Always acknowledged so MoMo stops retrying
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let order = data(
        customer
            .get(&format!("/api/orders/{order_id}"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(order["payment_status"], "unpaid");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_malformed_ipn_is_rejected() {
    let anon = TestClient::anonymous();
    let resp = anon
        .post("/api/payments/momo/ipn")
        .json(&json!({ "orderId": "x" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}
