//! The customer's return requests.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use tracing::instrument;

use techmart_core::ReturnRequestId;

use crate::db::ReturnRepository;
use crate::db::returns::ReturnFilter;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::{ReturnDetail, ReturnRequest};
use crate::response::{ApiResponse, ApiResult, PageParams, Paginated};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/returns", get(list))
        .route("/api/returns/{id}", get(show))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(mut filter): Query<ReturnFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<ReturnRequest>> {
    filter.user_id = Some(user.id);
    let (items, total) = ReturnRepository::new(state.pool())
        .list(filter, page)
        .await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn show(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<ReturnRequestId>,
) -> ApiResult<ReturnDetail> {
    let detail = ReturnRepository::new(state.pool())
        .get(id, Some(user.id))
        .await?
        .ok_or_else(|| AppError::NotFound("return request not found".to_owned()))?;
    Ok(ApiResponse::ok(detail))
}
