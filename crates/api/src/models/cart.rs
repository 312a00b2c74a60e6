//! Cart and wishlist views.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use techmart_core::rules::pricing;
use techmart_core::{CartItemId, ProductId, VariantAttributes, VariantId};

/// A cart line joined with current product and variant data.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLineRow {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
    pub product_name: String,
    pub slug: String,
    pub thumbnail_url: Option<String>,
    pub base_price: Decimal,
    pub variant_price: Option<Decimal>,
    pub attributes: Option<VariantAttributes>,
    /// Variant stock when a variant is selected, product stock otherwise.
    pub available_stock: i32,
    pub is_active: bool,
}

/// A cart line as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub slug: String,
    pub thumbnail_url: Option<String>,
    pub variant_label: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub available_stock: i32,
    pub is_available: bool,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        let unit_price = pricing::unit_price(row.base_price, row.variant_price);
        Self {
            id: row.id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            product_name: row.product_name,
            slug: row.slug,
            thumbnail_url: row.thumbnail_url,
            variant_label: row.attributes.as_ref().map(VariantAttributes::label),
            quantity: row.quantity,
            unit_price,
            line_total: pricing::line_total(unit_price, row.quantity),
            available_stock: row.available_stock,
            is_available: row.is_active && row.available_stock >= row.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub item_count: i64,
    pub subtotal: Decimal,
}

impl Cart {
    #[must_use]
    pub fn from_rows(rows: Vec<CartLineRow>) -> Self {
        let items: Vec<CartLine> = rows.into_iter().map(CartLine::from).collect();
        let subtotal = pricing::subtotal(items.iter().map(|l| (l.unit_price, l.quantity)));
        let item_count = items.iter().map(|l| i64::from(l.quantity)).sum();
        Self {
            items,
            item_count,
            subtotal,
        }
    }
}

/// A wishlisted product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WishlistEntry {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub stock: i32,
    pub thumbnail_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn row(quantity: i32, variant_price: Option<Decimal>) -> CartLineRow {
        let attributes = variant_price.map(|_| {
            VariantAttributes::new(BTreeMap::from([
                ("color".to_owned(), "Black".to_owned()),
                ("storage".to_owned(), "256GB".to_owned()),
            ]))
            .unwrap_or_default()
        });
        CartLineRow {
            id: CartItemId::new(1),
            product_id: ProductId::new(10),
            variant_id: variant_price.map(|_| VariantId::new(3)),
            quantity,
            product_name: "iPhone 15".to_owned(),
            slug: "iphone-15".to_owned(),
            thumbnail_url: None,
            base_price: Decimal::new(20_000_000, 0),
            variant_price,
            attributes,
            available_stock: 5,
            is_active: true,
        }
    }

    #[test]
    fn test_cart_line_uses_variant_price() {
        let line = CartLine::from(row(2, Some(Decimal::new(23_000_000, 0))));
        assert_eq!(line.unit_price, Decimal::new(23_000_000, 0));
        assert_eq!(line.line_total, Decimal::new(46_000_000, 0));
        assert_eq!(line.variant_label.as_deref(), Some("Black / 256GB"));
    }

    #[test]
    fn test_cart_totals_and_availability() {
        let cart = Cart::from_rows(vec![row(1, None), row(6, Some(Decimal::new(1, 0)))]);
        assert_eq!(cart.item_count, 7);
        assert_eq!(cart.subtotal, Decimal::new(20_000_006, 0));
        assert!(cart.items.first().is_some_and(|l| l.is_available));
        assert!(cart.items.get(1).is_some_and(|l| !l.is_available));
    }
}
