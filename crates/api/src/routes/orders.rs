//! Customer order route handlers: checkout, history, cancellation, payment
//! retry and return requests.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use techmart_core::OrderId;

use crate::db::OrderRepository;
use crate::db::orders::OrderFilter;
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::AuthUser;
use crate::models::{Order, OrderDetail, OrderListItem, ReturnDetail};
use crate::response::{ApiResponse, ApiResult, PageParams, Paginated};
use crate::routes::optional_text;
use crate::services::orders::checkout::{place_order, retry_payment};
use crate::services::orders::returns::{ReturnForm, request_return};
use crate::services::orders::{CheckoutRequest, OrderService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list).post(create))
        .route("/api/orders/{id}", get(show))
        .route("/api/orders/{id}/cancel", post(cancel))
        .route("/api/orders/{id}/pay", post(pay))
        .route("/api/orders/{id}/returns", post(create_return))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentUrl {
    pub pay_url: String,
}

/// The customer's orders, newest first.
#[instrument(skip(state, user, filter), fields(user_id = %user.id))]
async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(mut filter): Query<OrderFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<OrderListItem>> {
    filter.user_id = Some(user.id);
    let (items, total) = OrderRepository::new(state.pool())
        .list(&filter, page)
        .await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

/// Place an order from the submitted lines.
///
/// For MoMo orders the response carries `pay_url`.
#[instrument(skip(state, user, body), fields(user_id = %user.id, payment_method = %body.payment_method))]
async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> ApiResult<OrderDetail> {
    let detail = place_order(state.pool(), state.momo(), user.id, &body).await?;
    let order_id = detail.order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
    Ok(ApiResponse::created(detail))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn show(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<OrderId>,
) -> ApiResult<OrderDetail> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(id, Some(user.id))
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_owned()))?;
    let items = orders.items(order.id).await?;
    Ok(ApiResponse::ok(OrderDetail::new(order, items)))
}

/// Cancel a pending order.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
async fn cancel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<OrderId>,
    Json(body): Json<CancelRequest>,
) -> ApiResult<Order> {
    let order = OrderService::new(state.pool(), state.email(), &state.config().frontend_url)
        .cancel(user.id, id, optional_text(body.reason.as_deref()))
        .await?;
    Ok(ApiResponse::ok(order))
}

/// Request a fresh MoMo payment page for an unpaid order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn pay(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<OrderId>,
) -> ApiResult<PaymentUrl> {
    let pay_url = retry_payment(state.pool(), state.momo(), user.id, id).await?;
    Ok(ApiResponse::ok(PaymentUrl { pay_url }))
}

/// Ask to return items of a delivered order.
#[instrument(skip(state, user, body), fields(user_id = %user.id, reason = %body.reason))]
async fn create_return(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<OrderId>,
    Json(body): Json<ReturnForm>,
) -> ApiResult<ReturnDetail> {
    let detail = request_return(state.pool(), user.id, id, &body).await?;
    Ok(ApiResponse::created(detail))
}
