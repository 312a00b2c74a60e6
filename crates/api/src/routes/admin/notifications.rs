//! Broadcast notifications.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::NotificationRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::response::{ApiResponse, ApiResult};
use crate::routes::{optional_text, required};
use crate::state::AppState;

const MAX_TITLE_LENGTH: usize = 200;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/notifications/broadcast", post(broadcast))
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BroadcastResult {
    pub recipients: u64,
}

/// Send an in-app notification to every active user.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn broadcast(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<BroadcastRequest>,
) -> ApiResult<BroadcastResult> {
    let title = required("title", &body.title)?;
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::Validation(
            "title must be at most 200 characters".to_owned(),
        ));
    }
    let message = required("message", &body.message)?;

    let recipients = NotificationRepository::new(state.pool())
        .broadcast(title, message, optional_text(body.link.as_deref()))
        .await?;
    tracing::info!(recipients, "Notification broadcast");
    Ok(ApiResponse::ok(BroadcastResult { recipients }))
}
