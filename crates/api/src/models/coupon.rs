//! Coupon rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use techmart_core::rules::CouponTerms;
use techmart_core::{CouponId, Email, OrderId, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub description: Option<String>,
    pub discount_percent: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_order_value: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_per_user: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    #[must_use]
    pub fn terms(&self) -> CouponTerms {
        CouponTerms {
            discount_percent: self.discount_percent,
            max_discount: self.max_discount,
            min_order_value: self.min_order_value,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            usage_limit: self.usage_limit,
            usage_per_user: self.usage_per_user,
            used_count: self.used_count,
            is_active: self.is_active,
        }
    }
}

/// One redemption of a coupon.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CouponUsage {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: Email,
    pub order_total: Decimal,
    pub used_at: DateTime<Utc>,
}
