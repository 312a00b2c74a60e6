//! Coupon repository.
//!
//! Checkout locks the coupon row with [`lock_by_code`] and consumes it with
//! [`consume`], a conditional increment that fails once the total cap is
//! reached. Cancelling an order gives the usage back with [`release`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};

use techmart_core::{CouponId, OrderId, UserId};

use super::RepositoryError;
use crate::models::{Coupon, CouponUsage};

macro_rules! coupon_columns {
    () => {
        "id, code, description, discount_percent, max_discount, min_order_value, starts_at, \
         expires_at, usage_limit, usage_per_user, used_count, is_active, created_at, updated_at"
    };
}

/// Writable coupon fields.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponInput {
    pub code: String,
    pub description: Option<String>,
    pub discount_percent: Decimal,
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub min_order_value: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_per_user: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a coupon by code, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(concat!(
            "SELECT ",
            coupon_columns!(),
            " FROM coupons WHERE UPPER(code) = UPPER($1)"
        ))
        .bind(code.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(coupon)
    }

    /// How many times a user has redeemed a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_usage(
        &self,
        coupon_id: CouponId,
        user_id: UserId,
    ) -> Result<i64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        user_usage(&mut conn, coupon_id, user_id).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let coupons = sqlx::query_as::<_, Coupon>(concat!(
            "SELECT ",
            coupon_columns!(),
            " FROM coupons ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(coupons)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(concat!(
            "SELECT ",
            coupon_columns!(),
            " FROM coupons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(coupon)
    }

    /// Create a coupon. Codes are stored upper-cased.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(concat!(
            "INSERT INTO coupons (code, description, discount_percent, max_discount, \
             min_order_value, starts_at, expires_at, usage_limit, usage_per_user, is_active) \
             VALUES (UPPER($1), $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
            coupon_columns!()
        ))
        .bind(input.code.trim())
        .bind(input.description.as_deref())
        .bind(input.discount_percent)
        .bind(input.max_discount)
        .bind(input.min_order_value)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.usage_limit)
        .bind(input.usage_per_user)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "coupon code already exists"))
    }

    /// Replace a coupon's terms. The used count is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn update(
        &self,
        id: CouponId,
        input: &CouponInput,
    ) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(concat!(
            "UPDATE coupons SET code = UPPER($2), description = $3, discount_percent = $4, \
             max_discount = $5, min_order_value = $6, starts_at = $7, expires_at = $8, \
             usage_limit = $9, usage_per_user = $10, is_active = $11, updated_at = NOW() \
             WHERE id = $1 RETURNING ",
            coupon_columns!()
        ))
        .bind(id)
        .bind(input.code.trim())
        .bind(input.description.as_deref())
        .bind(input.discount_percent)
        .bind(input.max_discount)
        .bind(input.min_order_value)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.usage_limit)
        .bind(input.usage_per_user)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "coupon code already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a coupon. Orders keep the code snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Redemptions of a coupon, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn usages(&self, id: CouponId) -> Result<Vec<CouponUsage>, RepositoryError> {
        let usages = sqlx::query_as::<_, CouponUsage>(
            "SELECT cu.order_id, cu.user_id, u.name AS user_name, u.email AS user_email, \
             o.total AS order_total, cu.used_at \
             FROM coupon_usages cu \
             JOIN users u ON u.id = cu.user_id \
             JOIN orders o ON o.id = cu.order_id \
             WHERE cu.coupon_id = $1 ORDER BY cu.used_at DESC",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(usages)
    }
}

/// Lock a coupon row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_code(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<Coupon>, RepositoryError> {
    let coupon = sqlx::query_as::<_, Coupon>(concat!(
        "SELECT ",
        coupon_columns!(),
        " FROM coupons WHERE UPPER(code) = UPPER($1) FOR UPDATE"
    ))
    .bind(code.trim())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(coupon)
}

/// How many times a user has redeemed a coupon.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn user_usage(
    conn: &mut PgConnection,
    coupon_id: CouponId,
    user_id: UserId,
) -> Result<i64, RepositoryError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2",
    )
    .bind(coupon_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

/// Record a redemption for `order_id`.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` when the increment matches no row,
/// i.e. the coupon was disabled or reached its cap concurrently.
pub async fn consume(
    conn: &mut PgConnection,
    coupon_id: CouponId,
    user_id: UserId,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE coupons SET used_count = used_count + 1, updated_at = NOW() \
         WHERE id = $1 AND is_active AND (usage_limit IS NULL OR used_count < usage_limit)",
    )
    .bind(coupon_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(
            "coupon usage limit has been reached".to_owned(),
        ));
    }

    sqlx::query("INSERT INTO coupon_usages (coupon_id, user_id, order_id) VALUES ($1, $2, $3)")
        .bind(coupon_id)
        .bind(user_id)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Give back the redemption recorded for an order, if any.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn release(conn: &mut PgConnection, order_id: OrderId) -> Result<(), RepositoryError> {
    let coupon_id: Option<CouponId> =
        sqlx::query_scalar("DELETE FROM coupon_usages WHERE order_id = $1 RETURNING coupon_id")
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some(coupon_id) = coupon_id {
        sqlx::query(
            "UPDATE coupons SET used_count = GREATEST(used_count - 1, 0), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(coupon_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
