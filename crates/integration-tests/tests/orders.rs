//! Integration tests for the cart, checkout and order lifecycle.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API server running (cargo run -p techmart-api)
//! - `TECHMART_ADMIN_EMAIL` / `TECHMART_ADMIN_PASSWORD` for an admin account

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use reqwest::StatusCode;
use serde_json::json;

use techmart_integration_tests::{
    TestClient, amount, checkout_body, create_product, create_variant_product, data, deliver,
    error, stock_levels, unique_slug,
};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_cart_add_merges_lines() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 1_000_000, 10).await;
    let customer = TestClient::customer().await;

    for _ in 0..2 {
        let resp = customer
            .post("/api/cart")
            .json(&json!({ "product_id": product_id, "quantity": 2 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let cart = data(customer.get("/api/cart").send().await.unwrap()).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["item_count"], 4);
    assert!((amount(&cart["subtotal"]) - 4_000_000.0).abs() < 0.5);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_cart_rejects_more_than_stock() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 500_000, 1).await;
    let customer = TestClient::customer().await;

    let resp = customer
        .post("/api/cart")
        .json(&json!({ "product_id": product_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_checkout_cancel_flow() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 2_000_000, 5).await;
    let customer = TestClient::customer().await;

    let resp = customer
        .post("/api/orders")
        .json(&checkout_body(product_id, 2))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = data(resp).await;
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "unpaid");
    assert!((amount(&order["total"]) - 4_000_000.0).abs() < 0.5);

    let history = data(customer.get("/api/orders").send().await.unwrap()).await;
    assert_eq!(history["total"], 1);

    let resp = customer
        .post(&format!("/api/orders/{order_id}/cancel"))
        .json(&json!({ "reason": "Changed my mind" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(data(resp).await["status"], "cancelled");

    // A second cancel is rejected
    let resp = customer
        .post(&format!("/api/orders/{order_id}/cancel"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_orders_are_private() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 300_000, 5).await;
    let owner = TestClient::customer().await;
    let other = TestClient::customer().await;

    let order = data(
        owner
            .post("/api/orders")
            .json(&checkout_body(product_id, 1))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let order_id = order["id"].as_i64().unwrap();

    let resp = other
        .get(&format!("/api/orders/{order_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_fulfilment_and_return() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 1_500_000, 3).await;
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
    let item_id = order["items"][0]["id"].as_i64().unwrap();

    // Skipping a step is rejected
    let resp = admin
        .put(&format!("/api/admin/orders/{order_id}/status"))
        .json(&json!({ "status": "delivered" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());

    for status in ["processing", "shipping", "delivered"] {
        let resp = admin
            .put(&format!("/api/admin/orders/{order_id}/status"))
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "moving to {status}");
    }

    // Shipping took one unit
    let product = data(
        admin
            .get(&format!("/api/products/{product_id}"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(product["stock"], 2);

    let resp = customer
        .post(&format!("/api/orders/{order_id}/returns"))
        .json(&json!({
            "reason": "other",
            "items": [{ "order_item_id": item_id, "quantity": 1 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let return_id = data(resp).await["id"].as_i64().unwrap();

    let resp = admin
        .post(&format!("/api/admin/returns/{return_id}/approve"))
        .json(&json!({ "admin_note": "Inspected" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(data(resp).await["status"], "approved");

    let order = data(
        customer
            .get(&format!("/api/orders/{order_id}"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(order["status"], "returned");
    assert_eq!(order["payment_status"], "refunded");

    // The unit came back into stock
    assert_eq!(stock_levels(&admin, product_id).await.0, 3);

    let notifications = data(customer.get("/api/notifications").send().await.unwrap()).await;
    assert!(notifications["total"].as_i64().unwrap() >= 4);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_coupon_preview_and_checkout() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 1_000_000, 5).await;
    let code = unique_slug("SAVE").replace('-', "").to_uppercase();
    let code = code.get(..20).unwrap().to_owned();

    let resp = admin
        .post("/api/admin/coupons")
        .json(&json!({
            "code": code,
            "discount_percent": "10",
            "max_discount": "50000",
            "min_order_value": "0",
            "usage_per_user": 1,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let customer = TestClient::customer().await;
    let preview = data(
        customer
            .post("/api/coupons/validate")
            .json(&json!({ "code": code.to_lowercase(), "subtotal": "1000000" }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    // 10% capped at 50,000
    assert!((amount(&preview["discount"]) - 50_000.0).abs() < 0.5);

    let mut body = checkout_body(product_id, 1);
    body["coupon_code"] = json!(code);
    let order = data(customer.post("/api/orders").json(&body).send().await.unwrap()).await;
    assert!((amount(&order["total"]) - 950_000.0).abs() < 0.5);

    // Per-user cap reached
    let resp = customer
        .post("/api/orders")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!error(resp).await.is_empty());
}

/// Place a COD order for one variant line and return the order and item ids.
async fn order_variant(
    customer: &TestClient,
    product_id: i64,
    variant_id: i64,
    quantity: i32,
) -> (i64, i64) {
    let mut body = checkout_body(product_id, quantity);
    body["items"][0]["variant_id"] = json!(variant_id);
    let resp = customer.post("/api/orders").json(&body).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = data(resp).await;
    (
        order["id"].as_i64().unwrap(),
        order["items"][0]["id"].as_i64().unwrap(),
    )
}

/// Request a return of `quantity` units of one line, then approve it.
async fn return_and_approve(
    admin: &TestClient,
    customer: &TestClient,
    order_id: i64,
    item_id: i64,
    quantity: i32,
    reason: &str,
) {
    let resp = customer
        .post(&format!("/api/orders/{order_id}/returns"))
        .json(&json!({
            "reason": reason,
            "items": [{ "order_item_id": item_id, "quantity": quantity }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let return_id = data(resp).await["id"].as_i64().unwrap();

    let resp = admin
        .post(&format!("/api/admin/returns/{return_id}/approve"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_approved_return_restocks_variant_and_resyncs_aggregate() {
    let admin = TestClient::admin().await;
    let (product_id, variants) = create_variant_product(&admin, &[5, 5]).await;
    let customer = TestClient::customer().await;

    let (order_id, item_id) = order_variant(&customer, product_id, variants[0], 2).await;
    deliver(&admin, order_id).await;
    assert_eq!(stock_levels(&admin, product_id).await, (8, 8));

    return_and_approve(&admin, &customer, order_id, item_id, 2, "other").await;
    assert_eq!(stock_levels(&admin, product_id).await, (10, 10));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_defective_return_is_not_restocked() {
    let admin = TestClient::admin().await;
    let (product_id, variants) = create_variant_product(&admin, &[3, 2]).await;
    let customer = TestClient::customer().await;

    let (order_id, item_id) = order_variant(&customer, product_id, variants[0], 1).await;
    deliver(&admin, order_id).await;
    return_and_approve(&admin, &customer, order_id, item_id, 1, "defective").await;

    assert_eq!(stock_levels(&admin, product_id).await, (4, 4));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_removed_variant_keeps_aggregate_stock_consistent() {
    let admin = TestClient::admin().await;
    let (product_id, variants) = create_variant_product(&admin, &[5, 5]).await;
    let customer = TestClient::customer().await;

    let (order_id, item_id) = order_variant(&customer, product_id, variants[0], 2).await;

    // Still needed to ship the order
    let resp = admin
        .delete(&format!("/api/admin/variants/{}", variants[0]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    deliver(&admin, order_id).await;
    let resp = admin
        .delete(&format!("/api/admin/variants/{}", variants[0]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stock_levels(&admin, product_id).await, (5, 5));

    // The returned units have nowhere to go, so the aggregate stays the sum
    return_and_approve(&admin, &customer, order_id, item_id, 2, "other").await;
    assert_eq!(stock_levels(&admin, product_id).await, (5, 5));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_coupon_below_minimum_order_writes_nothing() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 1_000_000, 5).await;
    let code = unique_slug("MIN").replace('-', "").to_uppercase();
    let code = code.get(..20).unwrap().to_owned();

    let resp = admin
        .post("/api/admin/coupons")
        .json(&json!({
            "code": code,
            "discount_percent": "10",
            "min_order_value": "5000000",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let coupon_id = data(resp).await["id"].as_i64().unwrap();

    let customer = TestClient::customer().await;
    let resp = customer
        .post("/api/cart")
        .json(&json!({ "product_id": product_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let mut body = checkout_body(product_id, 1);
    body["coupon_code"] = json!(code);
    let resp = customer.post("/api/orders").json(&body).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!error(resp).await.is_empty());

    let history = data(customer.get("/api/orders").send().await.unwrap()).await;
    assert_eq!(history["total"], 0);

    let cart = data(customer.get("/api/cart").send().await.unwrap()).await;
    assert_eq!(cart["item_count"], 1);

    let usages = data(
        admin
            .get(&format!("/api/admin/coupons/{coupon_id}/usages"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert!(usages.as_array().unwrap().is_empty());

    let coupons = data(admin.get("/api/admin/coupons").send().await.unwrap()).await;
    let coupon = coupons
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == coupon_id)
        .unwrap();
    assert_eq!(coupon["used_count"], 0);
}
