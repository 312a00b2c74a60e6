//! Shopping cart route handlers.
//!
//! Every change re-checks the line against current catalog data with the
//! same pricing rules checkout uses, then returns the whole cart.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use techmart_core::{CartItemId, ProductId, UserId, VariantId};

use crate::db::{CartRepository, RepositoryError};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::Cart;
use crate::response::{ApiResponse, ApiResult};
use crate::services::orders::LineRequest;
use crate::services::orders::checkout::{check_quantity, price_line};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(show).post(add).delete(clear))
        .route("/api/cart/{id}", put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: i32,
}

async fn load_cart(state: &AppState, user_id: UserId) -> Result<Cart, AppError> {
    let rows = CartRepository::new(state.pool()).lines(user_id).await?;
    Ok(Cart::from_rows(rows))
}

/// Validate a line at its resulting quantity against current stock.
async fn check_line(state: &AppState, line: LineRequest) -> Result<(), AppError> {
    check_quantity(line.quantity)?;
    let mut conn = state
        .pool()
        .acquire()
        .await
        .map_err(RepositoryError::from)?;
    price_line(&mut conn, line).await?;
    Ok(())
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn show(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Cart> {
    Ok(ApiResponse::ok(load_cart(&state, user.id).await?))
}

/// Add to cart, merging into an existing line for the same product/variant.
#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<AddToCartRequest>,
) -> ApiResult<Cart> {
    check_quantity(body.quantity)?;

    let carts = CartRepository::new(state.pool());
    let existing = carts
        .quantity_of(user.id, body.product_id, body.variant_id)
        .await?;
    check_line(
        &state,
        LineRequest {
            product_id: body.product_id,
            variant_id: body.variant_id,
            quantity: existing.saturating_add(body.quantity),
        },
    )
    .await?;

    carts
        .add(user.id, body.product_id, body.variant_id, body.quantity)
        .await?;
    Ok(ApiResponse::ok(load_cart(&state, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<CartItemId>,
    Json(body): Json<UpdateCartRequest>,
) -> ApiResult<Cart> {
    let carts = CartRepository::new(state.pool());
    let line = carts
        .line(user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("cart item not found".to_owned()))?;

    check_line(
        &state,
        LineRequest {
            product_id: line.product_id,
            variant_id: line.variant_id,
            quantity: body.quantity,
        },
    )
    .await?;

    carts.set_quantity(user.id, id, body.quantity).await?;
    Ok(ApiResponse::ok(load_cart(&state, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<CartItemId>,
) -> ApiResult<Cart> {
    CartRepository::new(state.pool()).remove(user.id, id).await?;
    Ok(ApiResponse::ok(load_cart(&state, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn clear(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Cart> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(ApiResponse::ok(load_cart(&state, user.id).await?))
}
