//! Coupon preview for the checkout page.

use axum::{Json, Router, extract::State, routing::post};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::middleware::AuthUser;
use crate::response::{ApiResponse, ApiResult};
use crate::routes::required;
use crate::services::orders::CouponPreview;
use crate::services::orders::checkout::preview_coupon;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/coupons/validate", post(validate))
}

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal: Decimal,
}

/// What the coupon would take off `subtotal` for this customer.
///
/// Uses the same evaluation as checkout, including the per-user cap, but
/// redeems nothing.
#[instrument(skip(state, user, body), fields(user_id = %user.id, code = %body.code))]
async fn validate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<ValidateCouponRequest>,
) -> ApiResult<CouponPreview> {
    let code = required("code", &body.code)?;
    let preview = preview_coupon(state.pool(), user.id, code, body.subtotal).await?;
    Ok(ApiResponse::ok(preview))
}
