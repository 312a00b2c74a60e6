//! Review moderation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, put},
};
use serde::Deserialize;
use tracing::instrument;

use techmart_core::ReviewId;

use crate::db::ReviewRepository;
use crate::middleware::RequireAdmin;
use crate::models::Review;
use crate::response::{ApiResponse, ApiResult, Message, PageParams, Paginated};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/reviews", get(list))
        .route("/api/admin/reviews/{id}/visibility", put(set_visibility))
        .route("/api/admin/reviews/{id}", delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub is_visible: bool,
}

/// Every review, hidden ones included.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Review>> {
    let (items, total) = ReviewRepository::new(state.pool()).list_all(page).await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id, visible = body.is_visible))]
async fn set_visibility(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReviewId>,
    Json(body): Json<VisibilityRequest>,
) -> ApiResult<Review> {
    let review = ReviewRepository::new(state.pool())
        .set_visible(id, body.is_visible)
        .await?;
    Ok(ApiResponse::ok(review))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> ApiResult<Message> {
    ReviewRepository::new(state.pool()).delete(id, None).await?;
    tracing::info!(review_id = %id, "Review removed");
    Ok(ApiResponse::ok(Message::new("Review deleted")))
}
