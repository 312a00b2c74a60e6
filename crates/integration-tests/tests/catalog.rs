//! Integration tests for the public catalog and its admin management.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API server running (cargo run -p techmart-api)
//! - `TECHMART_ADMIN_EMAIL` / `TECHMART_ADMIN_PASSWORD` for an admin account

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;

use techmart_integration_tests::{TestClient, create_product, data, error, unique_slug};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_product_listing_is_paginated() {
    let anon = TestClient::anonymous();
    let resp = anon
        .get("/api/products?page=1&per_page=5&sort=price_asc")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page = data(resp).await;
    assert_eq!(page["page"], 1);
    assert_eq!(page["per_page"], 5);
    assert!(page["items"].as_array().unwrap().len() <= 5);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_inverted_price_range_is_rejected() {
    let anon = TestClient::anonymous();
    let resp = anon
        .get("/api/products?min_price=500&max_price=100")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_spec_template_limits_product_specs() {
    let admin = TestClient::admin().await;

    let resp = admin
        .post("/api/admin/categories")
        .json(&json!({
            "name": "Laptops",
            "slug": unique_slug("laptops"),
            "spec_template": [
                { "key": "cpu", "label": "CPU" },
                { "key": "ram", "label": "RAM" },
            ],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let category_id = data(resp).await["id"].as_i64().unwrap();

    // Key not declared by the template
    let resp = admin
        .post("/api/admin/products")
        .json(&json!({
            "category_id": category_id,
            "name": "Ultrabook",
            "slug": unique_slug("ultrabook"),
            "price": "25000000",
            "specs": { "gpu": "RTX 4060" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = admin
        .post("/api/admin/products")
        .json(&json!({
            "category_id": category_id,
            "name": "Ultrabook",
            "slug": unique_slug("ultrabook"),
            "price": "25000000",
            "specs": { "cpu": "Core Ultra 7", "ram": "16GB" },
            "variants": [
                { "sku": unique_slug("ub-16"), "attributes": { "ram": "16GB" }, "price": "25000000", "stock": 3 },
                { "sku": unique_slug("ub-32"), "attributes": { "ram": "32GB" }, "price": "29000000", "stock": 2 },
            ],
            "images": [{ "url": "https://cdn.techmart.test/ub.jpg" }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product = data(resp).await;
    assert_eq!(product["variants"].as_array().unwrap().len(), 2);
    // Product stock follows its variants
    assert_eq!(product["stock"], 5);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_inactive_products_are_hidden() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 100_000, 1).await;

    let product = data(
        admin
            .get(&format!("/api/products/{product_id}"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let resp = admin
        .put(&format!("/api/admin/products/{product_id}"))
        .json(&json!({
            "category_id": product["category_id"],
            "name": product["name"],
            "slug": product["slug"],
            "price": product["price"],
            "stock": 1,
            "is_active": false,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let anon = TestClient::anonymous();
    let resp = anon
        .get(&format!("/api/products/{product_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_slug_conflicts() {
    let admin = TestClient::admin().await;
    let slug = unique_slug("dup");
    let body = json!({ "name": "Dup", "slug": slug });

    let first = admin.post("/api/admin/categories").json(&body).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = admin.post("/api/admin/categories").json(&body).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert!(!error(second).await.is_empty());
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_review_requires_delivered_purchase() {
    let admin = TestClient::admin().await;
    let product_id = create_product(&admin, 200_000, 5).await;
    let customer = TestClient::customer().await;

    let resp = customer
        .post(&format!("/api/products/{product_id}/reviews"))
        .json(&json!({ "rating": 5, "comment": "Great" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let reviews = data(
        customer
            .get(&format!("/api/products/{product_id}/reviews"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(reviews["rating"]["count"], 0);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_dashboard_and_broadcast() {
    let admin = TestClient::admin().await;

    let dashboard = data(admin.get("/api/admin/dashboard").send().await.unwrap()).await;
    assert!(dashboard.get("recent_orders").is_some());

    let resp = admin
        .post("/api/admin/notifications/broadcast")
        .json(&json!({ "title": "Flash sale", "message": "Up to 30% off tonight" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(data(resp).await["recipients"].as_u64().unwrap() >= 1);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_newsletter_subscribe_is_idempotent() {
    let anon = TestClient::anonymous();
    let body = json!({ "email": techmart_integration_tests::unique_email("news") });

    for _ in 0..2 {
        let resp = anon
            .post("/api/newsletter/subscribe")
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = anon
        .post("/api/newsletter/unsubscribe")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
