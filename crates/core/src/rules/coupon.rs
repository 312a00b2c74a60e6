//! Percentage coupon evaluation.
//!
//! The same evaluation backs the public preview endpoint and checkout, so a
//! code that previews fine is accepted at checkout unless usage changed in
//! between.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotStarted,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit has been reached")]
    UsageLimitReached,
    #[error("you have already used this coupon the maximum number of times")]
    PerUserLimitReached,
    #[error("order subtotal must be at least {minimum}")]
    BelowMinimum { minimum: Decimal },
}

/// The terms of a coupon as stored on its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponTerms {
    /// Percentage off, 0-100.
    pub discount_percent: Decimal,
    /// Upper bound on the discount amount.
    pub max_discount: Option<Decimal>,
    pub min_order_value: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Total redemptions allowed across all users.
    pub usage_limit: Option<i32>,
    /// Redemptions allowed per user.
    pub usage_per_user: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
}

impl CouponTerms {
    /// Check the coupon against an order and compute the discount.
    ///
    /// `user_usage` is how many times this user has already redeemed it.
    /// The result never exceeds `subtotal` or `max_discount` and is rounded
    /// to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] that applies, in the order:
    /// active flag, validity window, total cap, per-user cap, minimum.
    pub fn evaluate(
        &self,
        subtotal: Decimal,
        user_usage: i64,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return Err(CouponRejection::NotStarted);
        }
        if self.expires_at.is_some_and(|end| now > end) {
            return Err(CouponRejection::Expired);
        }
        if self
            .usage_limit
            .is_some_and(|limit| self.used_count >= limit)
        {
            return Err(CouponRejection::UsageLimitReached);
        }
        if self
            .usage_per_user
            .is_some_and(|limit| user_usage >= i64::from(limit))
        {
            return Err(CouponRejection::PerUserLimitReached);
        }
        if subtotal < self.min_order_value {
            return Err(CouponRejection::BelowMinimum {
                minimum: self.min_order_value,
            });
        }

        Ok(self.discount_for(subtotal))
    }

    /// Discount for `subtotal`, ignoring eligibility.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let percent = self.discount_percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
        let mut discount = subtotal * percent / Decimal::ONE_HUNDRED;
        if let Some(cap) = self.max_discount {
            discount = discount.min(cap.max(Decimal::ZERO));
        }
        discount
            .min(subtotal)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn terms() -> CouponTerms {
        CouponTerms {
            discount_percent: Decimal::new(10, 0),
            max_discount: None,
            min_order_value: Decimal::ZERO,
            starts_at: None,
            expires_at: None,
            usage_limit: None,
            usage_per_user: None,
            used_count: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let discount = terms()
            .evaluate(Decimal::new(1_000_000, 0), 0, Utc::now())
            .unwrap();
        assert_eq!(discount, Decimal::new(100_000, 0));
    }

    #[test]
    fn test_discount_capped() {
        let coupon = CouponTerms {
            max_discount: Some(Decimal::new(50_000, 0)),
            ..terms()
        };
        let discount = coupon
            .evaluate(Decimal::new(1_000_000, 0), 0, Utc::now())
            .unwrap();
        assert_eq!(discount, Decimal::new(50_000, 0));
    }

    #[test]
    fn test_discount_never_exceeds_subtotal() {
        let coupon = CouponTerms {
            discount_percent: Decimal::new(150, 0),
            ..terms()
        };
        let subtotal = Decimal::new(30_000, 0);
        assert_eq!(coupon.discount_for(subtotal), subtotal);
        assert_eq!(coupon.discount_for(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_discount_rounded_to_cents() {
        let coupon = CouponTerms {
            discount_percent: Decimal::new(333, 1),
            ..terms()
        };
        // 33.3% of 10.01 = 3.33333
        assert_eq!(coupon.discount_for(Decimal::new(1001, 2)), Decimal::new(333, 2));
    }

    #[test]
    fn test_per_user_limit_blocks_second_use() {
        let coupon = CouponTerms {
            usage_per_user: Some(1),
            ..terms()
        };
        let subtotal = Decimal::new(500_000, 0);
        assert!(coupon.evaluate(subtotal, 0, Utc::now()).is_ok());
        assert_eq!(
            coupon.evaluate(subtotal, 1, Utc::now()),
            Err(CouponRejection::PerUserLimitReached)
        );
    }

    #[test]
    fn test_min_order_value() {
        let coupon = CouponTerms {
            min_order_value: Decimal::new(2_000_000, 0),
            ..terms()
        };
        assert_eq!(
            coupon.evaluate(Decimal::new(1_999_999, 0), 0, Utc::now()),
            Err(CouponRejection::BelowMinimum {
                minimum: Decimal::new(2_000_000, 0)
            })
        );
        assert!(coupon.evaluate(Decimal::new(2_000_000, 0), 0, Utc::now()).is_ok());
    }

    #[test]
    fn test_window_and_caps() {
        let now = Utc::now();
        let subtotal = Decimal::new(100_000, 0);

        let future = CouponTerms {
            starts_at: Some(now + Duration::days(1)),
            ..terms()
        };
        assert_eq!(future.evaluate(subtotal, 0, now), Err(CouponRejection::NotStarted));

        let expired = CouponTerms {
            expires_at: Some(now - Duration::seconds(1)),
            ..terms()
        };
        assert_eq!(expired.evaluate(subtotal, 0, now), Err(CouponRejection::Expired));

        let exhausted = CouponTerms {
            usage_limit: Some(5),
            used_count: 5,
            ..terms()
        };
        assert_eq!(
            exhausted.evaluate(subtotal, 0, now),
            Err(CouponRejection::UsageLimitReached)
        );

        let inactive = CouponTerms {
            is_active: false,
            ..terms()
        };
        assert_eq!(inactive.evaluate(subtotal, 0, now), Err(CouponRejection::Inactive));
    }
}
