//! TechMart API library.
//!
//! The storefront and admin REST API as a library, so the binary, the CLI
//! and the tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::ApiConfig;
use crate::state::AppState;

const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// CORS for the configured storefront origins. Invalid entries are skipped
/// with a warning.
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([middleware::REQUEST_ID_HEADER])
        .max_age(CORS_MAX_AGE)
}

/// Build the application router with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config());

    routes::routes()
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;

    fn test_app(config: ApiConfig) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/techmart_test")
            .unwrap();
        app(AppState::new(config, pool).unwrap())
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let app = test_app(config::tests::test_config());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
    }

    #[tokio::test]
    async fn test_me_without_token_is_unauthorized() {
        let app = test_app(config::tests::test_config());
        let request = Request::get("/api/auth/me")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }

    async fn statuses(app: &Router, method: &str, uri: &str, times: usize) -> Vec<StatusCode> {
        let mut statuses = Vec::with_capacity(times);
        for _ in 0..times {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header("x-real-ip", "198.51.100.7")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap();
            statuses.push(app.clone().oneshot(request).await.unwrap().status());
        }
        statuses
    }

    #[tokio::test]
    async fn test_momo_ipn_is_not_rate_limited() {
        let app = test_app(config::tests::test_config());

        // A burst past the general limit is throttled on customer routes
        let cart = statuses(&app, "GET", "/api/cart", 60).await;
        assert!(cart.contains(&StatusCode::TOO_MANY_REQUESTS));

        // but every gateway callback from the same address reaches the handler
        let ipn = statuses(&app, "POST", "/api/payments/momo/ipn", 60).await;
        assert!(!ipn.contains(&StatusCode::TOO_MANY_REQUESTS));
        assert!(ipn.iter().all(StatusCode::is_client_error));
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let mut config = config::tests::test_config();
        config.cors_allowed_origins = vec!["https://techmart.vn".to_owned()];
        let app = test_app(config);
        let request = Request::get("/health")
            .header("origin", "https://techmart.vn")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "https://techmart.vn"
        );
    }
}
