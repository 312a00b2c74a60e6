//! Newsletter subscription route handlers.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use tracing::instrument;

use techmart_core::Email;

use crate::db::NewsletterRepository;
use crate::response::{ApiResponse, ApiResult, Message};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/newsletter/subscribe", post(subscribe))
        .route("/api/newsletter/unsubscribe", post(unsubscribe))
}

#[derive(Debug, Deserialize)]
pub struct NewsletterRequest {
    pub email: String,
}

/// Subscribe an address. Subscribing twice is harmless and reactivates a
/// previously unsubscribed address.
#[instrument(skip(state, body))]
async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<NewsletterRequest>,
) -> ApiResult<Message> {
    let email = Email::parse(&body.email)?;
    let subscriber = NewsletterRepository::new(state.pool())
        .subscribe(&email)
        .await?;
    tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscription");
    Ok(ApiResponse::ok(Message::new("Subscribed to the newsletter")))
}

#[instrument(skip(state, body))]
async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<NewsletterRequest>,
) -> ApiResult<Message> {
    let email = Email::parse(&body.email)?;
    NewsletterRepository::new(state.pool())
        .unsubscribe(&email)
        .await?;
    Ok(ApiResponse::ok(Message::new("Unsubscribed from the newsletter")))
}
