//! Integration tests for the TechMart API.
//!
//! The tests talk to a running server over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p techmart-cli -- migrate
//! cargo run -p techmart-cli -- admin create -e admin@techmart.test -n Admin -p 'Admin-pass-1'
//! cargo run -p techmart-api &
//! TECHMART_ADMIN_EMAIL=admin@techmart.test TECHMART_ADMIN_PASSWORD='Admin-pass-1' \
//!     cargo test -p techmart-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `TECHMART_API_URL` - API base URL (default `http://localhost:8080`)
//! - `TECHMART_ADMIN_EMAIL` / `TECHMART_ADMIN_PASSWORD` - an existing admin

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the API under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("TECHMART_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// Absolute URL for an API path.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url().trim_end_matches('/'))
}

/// An HTTP client plus the bearer token of the signed-in user, if any.
pub struct TestClient {
    pub client: Client,
    pub token: Option<String>,
}

impl TestClient {
    /// A client with no token.
    ///
    /// Each client claims its own `x-real-ip`, so the per-IP auth rate limit
    /// does not throttle a whole test run.
    #[must_use]
    pub fn anonymous() -> Self {
        let id = Uuid::new_v4();
        let [a, b, c, ..] = *id.as_bytes();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-real-ip",
            HeaderValue::from_str(&format!("10.{a}.{b}.{c}")).unwrap(),
        );
        Self {
            client: Client::builder().default_headers(headers).build().unwrap(),
            token: None,
        }
    }

    /// Register a fresh customer with a unique email and sign in as them.
    pub async fn customer() -> Self {
        let email = unique_email("customer");
        let mut this = Self::anonymous();
        let resp = this
            .post("/api/auth/register")
            .json(&json!({
                "name": "Test Customer",
                "email": email,
                "password": "Test-pass-123",
                "phone": "0901234567",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = data(resp).await;
        this.token = Some(body["token"].as_str().unwrap().to_owned());
        this
    }

    /// Sign in as the admin named by `TECHMART_ADMIN_EMAIL`.
    pub async fn admin() -> Self {
        let email = std::env::var("TECHMART_ADMIN_EMAIL").unwrap();
        let password = std::env::var("TECHMART_ADMIN_PASSWORD").unwrap();
        let mut this = Self::anonymous();
        let resp = this
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = data(resp).await;
        this.token = Some(body["token"].as_str().unwrap().to_owned());
        this
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(url(path)))
    }

    #[must_use]
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(url(path)))
    }

    #[must_use]
    pub fn put(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.put(url(path)))
    }

    #[must_use]
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.delete(url(path)))
    }
}

/// An email address no other test run has used.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@techmart.test", Uuid::new_v4().simple())
}

/// A slug no other test run has used.
#[must_use]
pub fn unique_slug(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Unwrap a success envelope and return its `data`.
pub async fn data(resp: Response) -> Value {
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true, "unexpected body: {body}");
    body["data"].clone()
}

/// Unwrap an error envelope and return its message.
pub async fn error(resp: Response) -> String {
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false, "unexpected body: {body}");
    body["error"].as_str().unwrap().to_owned()
}

/// Create an active category, brand-less product with `stock` units as the
/// admin and return the product id.
pub async fn create_product(admin: &TestClient, price: u64, stock: i32) -> i64 {
    let category = admin
        .post("/api/admin/categories")
        .json(&json!({ "name": "Test Phones", "slug": unique_slug("phones") }))
        .send()
        .await
        .unwrap();
    assert_eq!(category.status(), StatusCode::CREATED);
    let category_id = data(category).await["id"].as_i64().unwrap();

    let product = admin
        .post("/api/admin/products")
        .json(&json!({
            "category_id": category_id,
            "name": "Test Phone",
            "slug": unique_slug("test-phone"),
            "price": price.to_string(),
            "stock": stock,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(product.status(), StatusCode::CREATED);
    data(product).await["id"].as_i64().unwrap()
}

/// Create a product with one variant per entry of `stocks` and return the
/// product id and the variant ids in the same order.
pub async fn create_variant_product(admin: &TestClient, stocks: &[i32]) -> (i64, Vec<i64>) {
    let category = admin
        .post("/api/admin/categories")
        .json(&json!({ "name": "Test Laptops", "slug": unique_slug("laptops") }))
        .send()
        .await
        .unwrap();
    assert_eq!(category.status(), StatusCode::CREATED);
    let category_id = data(category).await["id"].as_i64().unwrap();

    let variants: Vec<Value> = stocks
        .iter()
        .enumerate()
        .map(|(i, stock)| {
            json!({
                "sku": unique_slug(&format!("sku-{i}")),
                "attributes": { "option": format!("option-{i}") },
                "stock": stock,
            })
        })
        .collect();
    let product = admin
        .post("/api/admin/products")
        .json(&json!({
            "category_id": category_id,
            "name": "Test Laptop",
            "slug": unique_slug("test-laptop"),
            "price": "10000000",
            "variants": variants,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(product.status(), StatusCode::CREATED);
    let product = data(product).await;

    // Order the ids by the option label they were created with
    let mut ids: Vec<(String, i64)> = product["variants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| {
            let option = v["attributes"]["option"].as_str().unwrap().to_owned();
            (option, v["id"].as_i64().unwrap())
        })
        .collect();
    ids.sort();
    (
        product["id"].as_i64().unwrap(),
        ids.into_iter().map(|(_, id)| id).collect(),
    )
}

/// A product's aggregate stock and the sum of its variants' stock, read by an
/// admin so inactive products are visible too.
pub async fn stock_levels(admin: &TestClient, product_id: i64) -> (i64, i64) {
    let product = data(
        admin
            .get(&format!("/api/products/{product_id}"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let variant_sum = product["variants"]
        .as_array()
        .map_or(0, |vs| vs.iter().map(|v| v["stock"].as_i64().unwrap()).sum());
    (product["stock"].as_i64().unwrap(), variant_sum)
}

/// Move an order through the admin fulfilment steps up to `delivered`.
pub async fn deliver(admin: &TestClient, order_id: i64) {
    for status in ["processing", "shipping", "delivered"] {
        let resp = admin
            .put(&format!("/api/admin/orders/{order_id}/status"))
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "moving to {status}");
    }
}

/// A cash-on-delivery checkout body for one line.
#[must_use]
pub fn checkout_body(product_id: i64, quantity: i32) -> Value {
    json!({
        "items": [{ "product_id": product_id, "quantity": quantity }],
        "recipient_name": "Nguyen Van A",
        "phone": "0901234567",
        "street": "1 Le Loi",
        "ward": "Ben Nghe",
        "district": "District 1",
        "province": "Ho Chi Minh City",
        "payment_method": "cod",
    })
}

/// Read a decimal amount, serialised as a string or a number.
#[must_use]
pub fn amount(value: &Value) -> f64 {
    value
        .as_str()
        .map_or_else(|| value.as_f64().unwrap(), |s| s.parse().unwrap())
}
