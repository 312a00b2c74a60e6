//! Wishlist route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use serde::Deserialize;
use tracing::instrument;

use techmart_core::ProductId;

use crate::db::WishlistRepository;
use crate::middleware::AuthUser;
use crate::models::WishlistEntry;
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wishlist", get(list).post(add))
        .route("/api/wishlist/{product_id}", delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    pub product_id: ProductId,
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Vec<WishlistEntry>> {
    let entries = WishlistRepository::new(state.pool()).list(user.id).await?;
    Ok(ApiResponse::ok(entries))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<WishlistRequest>,
) -> ApiResult<Vec<WishlistEntry>> {
    let wishlist = WishlistRepository::new(state.pool());
    wishlist.add(user.id, body.product_id).await?;
    Ok(ApiResponse::ok(wishlist.list(user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<ProductId>,
) -> ApiResult<Vec<WishlistEntry>> {
    let wishlist = WishlistRepository::new(state.pool());
    wishlist.remove(user.id, product_id).await?;
    Ok(ApiResponse::ok(wishlist.list(user.id).await?))
}
