//! Line and cart pricing.

use rust_decimal::Decimal;

/// Price charged for one unit: the variant override wins over the base price.
#[must_use]
pub fn unit_price(base: Decimal, variant_override: Option<Decimal>) -> Decimal {
    variant_override.unwrap_or(base)
}

/// Total for one line.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Sum of `(unit_price, quantity)` pairs.
pub fn subtotal<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, qty)| line_total(price, qty))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_price_overrides_base() {
        let base = Decimal::new(20_000_000, 0);
        assert_eq!(unit_price(base, None), base);
        assert_eq!(
            unit_price(base, Some(Decimal::new(23_000_000, 0))),
            Decimal::new(23_000_000, 0)
        );
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let total = subtotal([
            (Decimal::new(150_000, 0), 2),
            (Decimal::new(99_500, 1), 1),
        ]);
        assert_eq!(total, Decimal::new(309_950, 0));
        assert_eq!(subtotal(Vec::new()), Decimal::ZERO);
    }
}
