//! Order management route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use techmart_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::db::orders::OrderFilter;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{OrderDetail, OrderListItem};
use crate::response::{ApiResponse, ApiResult, PageParams, Paginated};
use crate::services::orders::OrderService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/orders", get(list))
        .route("/api/admin/orders/{id}", get(show))
        .route("/api/admin/orders/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[instrument(skip(state, admin, filter), fields(admin_id = %admin.id))]
async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(filter): Query<OrderFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<OrderListItem>> {
    let (items, total) = OrderRepository::new(state.pool())
        .list(&filter, page)
        .await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> ApiResult<OrderDetail> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(id, None)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;
    let items = orders.items(id).await?;
    Ok(ApiResponse::ok(OrderDetail::new(order, items)))
}

/// Move an order along the fulfilment flow.
///
/// Shipping takes stock; cancelling a paid order marks it refunded. The
/// customer gets an in-app notification and, when email is configured, a
/// status email.
#[instrument(skip(state, admin), fields(admin_id = %admin.id, next = %body.status))]
async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<OrderDetail> {
    let detail = OrderService::new(state.pool(), state.email(), &state.config().frontend_url)
        .update_status(id, body.status)
        .await?;
    Ok(ApiResponse::ok(detail))
}
