//! Money helpers using decimal arithmetic.
//!
//! All amounts are Vietnamese đồng stored as `NUMERIC(14,2)` and carried as
//! [`Decimal`]. The đồng has no minor unit in practice, so payment gateways
//! receive whole numbers.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to whole đồng for gateways that only accept integers.
///
/// Returns `None` if the amount is negative or does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    if amount.is_sign_negative() {
        return None;
    }
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Format an amount for display, e.g. `1.250.000₫`.
#[must_use]
pub fn format_vnd(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if negative {
        format!("-{grouped}₫")
    } else {
        format!("{grouped}₫")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_vnd_groups_thousands() {
        assert_eq!(format_vnd(Decimal::new(1_250_000, 0)), "1.250.000₫");
        assert_eq!(format_vnd(Decimal::new(999, 0)), "999₫");
        assert_eq!(format_vnd(Decimal::ZERO), "0₫");
        assert_eq!(format_vnd(Decimal::new(-15_000, 0)), "-15.000₫");
    }

    #[test]
    fn test_format_vnd_rounds_fractions() {
        assert_eq!(format_vnd(Decimal::new(1_999_950, 2)), "20.000₫");
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(2_990_000, 0)), Some(2_990_000));
        assert_eq!(to_minor_units(Decimal::new(1_050, 1)), Some(105));
        assert_eq!(to_minor_units(Decimal::new(-1, 0)), None);
    }
}
