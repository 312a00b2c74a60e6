//! Newsletter subscribers and campaigns.
//!
//! A campaign is sent inline: one email per active subscriber, failures are
//! counted and logged but do not stop the loop.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::NewsletterRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Subscriber;
use crate::response::{ApiResponse, ApiResult, PageParams, Paginated};
use crate::routes::required;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/newsletter/subscribers", get(subscribers))
        .route("/api/admin/newsletter/send", post(send))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscriberQuery {
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct CampaignRequest {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct CampaignResult {
    pub sent: u32,
    pub failed: u32,
}

fn unsubscribe_link(frontend_url: &str, email: &str) -> Result<String, AppError> {
    let base = format!("{}/newsletter/unsubscribe", frontend_url.trim_end_matches('/'));
    url::Url::parse_with_params(&base, &[("email", email)])
        .map(String::from)
        .map_err(|e| AppError::Internal(format!("invalid frontend url: {e}")))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn subscribers(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<SubscriberQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Subscriber>> {
    let (items, total) = NewsletterRepository::new(state.pool())
        .list(query.active_only, page)
        .await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

/// Email a campaign to every active subscriber.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, subject = %body.subject))]
async fn send(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CampaignRequest>,
) -> ApiResult<CampaignResult> {
    let subject = required("subject", &body.subject)?;
    let text = required("body", &body.body)?;
    let Some(email) = state.email() else {
        return Err(AppError::BadRequest("Email is not configured".to_owned()));
    };

    let recipients = NewsletterRepository::new(state.pool())
        .active_emails()
        .await?;
    let frontend_url = &state.config().frontend_url;

    let mut result = CampaignResult::default();
    for recipient in &recipients {
        let unsubscribe_url = unsubscribe_link(frontend_url, recipient.as_str())?;
        match email
            .send_newsletter(recipient.as_str(), subject, text, &unsubscribe_url)
            .await
        {
            Ok(()) => result.sent += 1,
            Err(e) => {
                result.failed += 1;
                tracing::warn!(error = %e, recipient = %recipient.domain(), "Newsletter delivery failed");
            }
        }
    }

    tracing::info!(sent = result.sent, failed = result.failed, "Newsletter campaign sent");
    Ok(ApiResponse::ok(result))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unsubscribe_link_encodes_email() {
        let link = unsubscribe_link("https://techmart.vn/", "an+news@example.com").unwrap();
        assert_eq!(
            link,
            "https://techmart.vn/newsletter/unsubscribe?email=an%2Bnews%40example.com"
        );
    }
}
