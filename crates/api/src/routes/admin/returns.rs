//! Return request review.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use techmart_core::ReturnRequestId;

use crate::db::ReturnRepository;
use crate::db::returns::ReturnFilter;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{ReturnDetail, ReturnRequest};
use crate::response::{ApiResponse, ApiResult, PageParams, Paginated};
use crate::routes::optional_text;
use crate::services::orders::returns;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/returns", get(list))
        .route("/api/admin/returns/{id}", get(show))
        .route("/api/admin/returns/{id}/approve", post(approve))
        .route("/api/admin/returns/{id}/reject", post(reject))
}

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    #[serde(default)]
    pub admin_note: Option<String>,
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(filter): Query<ReturnFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<ReturnRequest>> {
    let (items, total) = ReturnRepository::new(state.pool())
        .list(filter, page)
        .await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReturnRequestId>,
) -> ApiResult<ReturnDetail> {
    let detail = ReturnRepository::new(state.pool())
        .get(id, None)
        .await?
        .ok_or_else(|| AppError::NotFound("Return request not found".to_owned()))?;
    Ok(ApiResponse::ok(detail))
}

/// Approve and refund. Non-defective items go back into stock.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn approve(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReturnRequestId>,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<ReturnDetail> {
    let detail = returns::approve(state.pool(), id, optional_text(body.admin_note.as_deref())).await?;
    Ok(ApiResponse::ok(detail))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn reject(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReturnRequestId>,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<ReturnDetail> {
    let detail = returns::reject(state.pool(), id, optional_text(body.admin_note.as_deref())).await?;
    Ok(ApiResponse::ok(detail))
}
