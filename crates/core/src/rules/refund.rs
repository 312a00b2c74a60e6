//! Return eligibility and refund amounts.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{OrderStatus, PaymentStatus, ReturnReason};

/// Days after delivery during which a return may be requested.
pub const RETURN_WINDOW_DAYS: i64 = 7;

/// Why an order cannot be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReturnIneligible {
    #[error("only delivered orders can be returned")]
    NotDelivered,
    #[error("only paid orders can be returned")]
    NotPaid,
    #[error("the 7-day return window has closed")]
    WindowClosed,
}

impl ReturnReason {
    /// Share of the line value refunded for this reason.
    #[must_use]
    pub fn refund_rate(self) -> Decimal {
        match self {
            Self::Defective => Decimal::ONE,
            // 20% restocking deduction
            Self::Other => Decimal::new(80, 2),
        }
    }
}

/// Check whether an order may have a return opened against it.
///
/// # Errors
///
/// Returns the reason the order is not eligible.
pub fn check_return_eligibility(
    status: OrderStatus,
    payment_status: PaymentStatus,
    delivered_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), ReturnIneligible> {
    if status != OrderStatus::Delivered {
        return Err(ReturnIneligible::NotDelivered);
    }
    if payment_status != PaymentStatus::Paid {
        return Err(ReturnIneligible::NotPaid);
    }
    // Delivered orders always carry a timestamp; a missing one is treated as closed.
    let Some(delivered_at) = delivered_at else {
        return Err(ReturnIneligible::WindowClosed);
    };
    if now - delivered_at > Duration::days(RETURN_WINDOW_DAYS) {
        return Err(ReturnIneligible::WindowClosed);
    }
    Ok(())
}

/// Refund for returning `quantity` units bought at `unit_price`.
#[must_use]
pub fn refund_amount(unit_price: Decimal, quantity: i32, reason: ReturnReason) -> Decimal {
    (unit_price * Decimal::from(quantity) * reason.refund_rate())
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defective_refunds_in_full() {
        let amount = refund_amount(Decimal::new(1_500_000, 0), 2, ReturnReason::Defective);
        assert_eq!(amount, Decimal::new(3_000_000, 0));
    }

    #[test]
    fn test_other_deducts_twenty_percent() {
        let amount = refund_amount(Decimal::new(1_500_000, 0), 2, ReturnReason::Other);
        assert_eq!(amount, Decimal::new(2_400_000, 0));
    }

    #[test]
    fn test_eligible_within_window() {
        let now = Utc::now();
        let delivered = now - Duration::days(6);
        assert_eq!(
            check_return_eligibility(
                OrderStatus::Delivered,
                PaymentStatus::Paid,
                Some(delivered),
                now
            ),
            Ok(())
        );
    }

    #[test]
    fn test_refused_after_window() {
        let now = Utc::now();
        let delivered = now - Duration::days(7) - Duration::minutes(1);
        assert_eq!(
            check_return_eligibility(
                OrderStatus::Delivered,
                PaymentStatus::Paid,
                Some(delivered),
                now
            ),
            Err(ReturnIneligible::WindowClosed)
        );
    }

    #[test]
    fn test_refused_unless_delivered_and_paid() {
        let now = Utc::now();
        assert_eq!(
            check_return_eligibility(OrderStatus::Shipping, PaymentStatus::Paid, None, now),
            Err(ReturnIneligible::NotDelivered)
        );
        assert_eq!(
            check_return_eligibility(
                OrderStatus::Delivered,
                PaymentStatus::Unpaid,
                Some(now),
                now
            ),
            Err(ReturnIneligible::NotPaid)
        );
        assert_eq!(
            check_return_eligibility(
                OrderStatus::ReturnRequested,
                PaymentStatus::Paid,
                Some(now),
                now
            ),
            Err(ReturnIneligible::NotDelivered)
        );
    }
}
