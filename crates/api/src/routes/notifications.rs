//! In-app notification route handlers.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use serde::Serialize;
use tracing::instrument;

use techmart_core::NotificationId;

use crate::db::NotificationRepository;
use crate::middleware::AuthUser;
use crate::models::Notification;
use crate::response::{ApiResponse, ApiResult, Message, PageParams, Paginated};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/{id}/read", post(mark_read))
        .route("/api/notifications/{id}", delete(remove))
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct Updated {
    pub updated: u64,
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<Notification>> {
    let (items, total) = NotificationRepository::new(state.pool())
        .list(user.id, page)
        .await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

async fn unread_count(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<UnreadCount> {
    let count = NotificationRepository::new(state.pool())
        .unread_count(user.id)
        .await?;
    Ok(ApiResponse::ok(UnreadCount { count }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<NotificationId>,
) -> ApiResult<Message> {
    NotificationRepository::new(state.pool())
        .mark_read(user.id, id)
        .await?;
    Ok(ApiResponse::ok(Message::new("Notification marked as read")))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Updated> {
    let updated = NotificationRepository::new(state.pool())
        .mark_all_read(user.id)
        .await?;
    Ok(ApiResponse::ok(Updated { updated }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<NotificationId>,
) -> ApiResult<Message> {
    NotificationRepository::new(state.pool())
        .delete(user.id, id)
        .await?;
    Ok(ApiResponse::ok(Message::new("Notification deleted")))
}
