//! Coupon management route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use rust_decimal::Decimal;
use tracing::instrument;

use techmart_core::CouponId;

use crate::db::CouponRepository;
use crate::db::coupons::CouponInput;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Coupon, CouponUsage};
use crate::response::{ApiResponse, ApiResult, Message};
use crate::state::AppState;

const MAX_CODE_LENGTH: usize = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/coupons", get(list).post(create))
        .route("/api/admin/coupons/{id}", put(update).delete(remove))
        .route("/api/admin/coupons/{id}/usages", get(usages))
}

fn invalid(message: &str) -> AppError {
    AppError::Validation(message.to_owned())
}

/// Check coupon terms before they reach the database.
fn validate(input: &CouponInput) -> Result<(), AppError> {
    let code = input.code.trim();
    if code.is_empty() {
        return Err(invalid("code is required"));
    }
    if code.len() > MAX_CODE_LENGTH || code.chars().any(char::is_whitespace) {
        return Err(invalid("code must be a single word of at most 50 characters"));
    }
    if input.discount_percent <= Decimal::ZERO || input.discount_percent > Decimal::ONE_HUNDRED {
        return Err(invalid("discount_percent must be greater than 0 and at most 100"));
    }
    if input.max_discount.is_some_and(|m| m < Decimal::ZERO) {
        return Err(invalid("max_discount must not be negative"));
    }
    if input.min_order_value < Decimal::ZERO {
        return Err(invalid("min_order_value must not be negative"));
    }
    if let (Some(starts), Some(expires)) = (input.starts_at, input.expires_at)
        && expires <= starts
    {
        return Err(invalid("expires_at must be after starts_at"));
    }
    if input.usage_limit.is_some_and(|n| n <= 0) {
        return Err(invalid("usage_limit must be positive"));
    }
    if input.usage_per_user.is_some_and(|n| n <= 0) {
        return Err(invalid("usage_per_user must be positive"));
    }
    Ok(())
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> ApiResult<Vec<Coupon>> {
    let coupons = CouponRepository::new(state.pool()).list().await?;
    Ok(ApiResponse::ok(coupons))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, code = %body.code))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CouponInput>,
) -> ApiResult<Coupon> {
    validate(&body)?;
    let coupon = CouponRepository::new(state.pool()).create(&body).await?;
    tracing::info!(coupon_id = %coupon.id, "Coupon created");
    Ok(ApiResponse::created(coupon))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CouponId>,
    Json(body): Json<CouponInput>,
) -> ApiResult<Coupon> {
    validate(&body)?;
    let coupon = CouponRepository::new(state.pool()).update(id, &body).await?;
    Ok(ApiResponse::ok(coupon))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CouponId>,
) -> ApiResult<Message> {
    CouponRepository::new(state.pool()).delete(id).await?;
    tracing::info!(coupon_id = %id, "Coupon deleted");
    Ok(ApiResponse::ok(Message::new("Coupon deleted")))
}

/// Who redeemed a coupon, on which order.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn usages(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CouponId>,
) -> ApiResult<Vec<CouponUsage>> {
    let coupons = CouponRepository::new(state.pool());
    if coupons.get(id).await?.is_none() {
        return Err(AppError::NotFound("Coupon not found".to_owned()));
    }
    Ok(ApiResponse::ok(coupons.usages(id).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn input() -> CouponInput {
        CouponInput {
            code: "SALE10".to_owned(),
            description: None,
            discount_percent: Decimal::new(10, 0),
            max_discount: Some(Decimal::new(500_000, 0)),
            min_order_value: Decimal::ZERO,
            starts_at: None,
            expires_at: None,
            usage_limit: Some(100),
            usage_per_user: Some(1),
            is_active: true,
        }
    }

    #[test]
    fn test_valid_coupon() {
        assert!(validate(&input()).is_ok());

        let mut full = input();
        full.discount_percent = Decimal::ONE_HUNDRED;
        assert!(validate(&full).is_ok());
    }

    #[test]
    fn test_discount_percent_bounds() {
        let mut coupon = input();
        coupon.discount_percent = Decimal::ZERO;
        assert!(validate(&coupon).is_err());

        coupon.discount_percent = Decimal::new(1001, 1);
        assert!(validate(&coupon).is_err());
    }

    #[test]
    fn test_code_and_limits() {
        let mut coupon = input();
        coupon.code = "  ".to_owned();
        assert!(validate(&coupon).is_err());

        let mut coupon = input();
        coupon.code = "TWO WORDS".to_owned();
        assert!(validate(&coupon).is_err());

        let mut coupon = input();
        coupon.usage_limit = Some(0);
        assert!(validate(&coupon).is_err());

        let mut coupon = input();
        coupon.usage_per_user = Some(-1);
        assert!(validate(&coupon).is_err());

        let mut coupon = input();
        coupon.min_order_value = Decimal::new(-1, 0);
        assert!(validate(&coupon).is_err());
    }

    #[test]
    fn test_expiry_after_start() {
        let now = Utc::now();
        let mut coupon = input();
        coupon.starts_at = Some(now);
        coupon.expires_at = Some(now - Duration::days(1));
        assert!(validate(&coupon).is_err());

        coupon.expires_at = Some(now + Duration::days(30));
        assert!(validate(&coupon).is_ok());
    }
}
