//! Order placement and coupon previews.
//!
//! Prices always come from the database, never from the client. Stock is
//! checked but not reserved: it is only taken when staff ship the order.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use techmart_core::rules::{CouponRejection, pricing};
use techmart_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId, VariantId, VariantAttributes};

use super::OrderError;
use crate::db::orders::{NewOrder, NewOrderItem};
use crate::db::{
    CouponRepository, OrderRepository, RepositoryError, carts, coupons, notifications, orders,
    products,
};
use crate::models::OrderDetail;
use crate::services::momo::MomoClient;

/// Largest quantity of one product (or variant) per cart line or order line.
pub const MAX_LINE_QUANTITY: i32 = 99;
const MAX_ORDER_LINES: usize = 50;

/// One product (or variant) and how many of it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
}

/// `POST /api/orders` body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    pub recipient_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub street: String,
    pub ward: String,
    pub district: String,
    pub province: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    fn validate(&self) -> Result<(), OrderError> {
        for (field, value) in [
            ("recipient_name", &self.recipient_name),
            ("phone", &self.phone),
            ("street", &self.street),
            ("ward", &self.ward),
            ("district", &self.district),
            ("province", &self.province),
        ] {
            if value.trim().is_empty() {
                return Err(OrderError::validation(format!("{field} is required")));
            }
        }
        if !is_valid_phone(&self.phone) {
            return Err(OrderError::validation("phone number is invalid"));
        }
        if self.items.is_empty() {
            return Err(OrderError::validation("order has no items"));
        }
        if self.items.len() > MAX_ORDER_LINES {
            return Err(OrderError::validation(format!(
                "an order may contain at most {MAX_ORDER_LINES} lines"
            )));
        }
        Ok(())
    }
}

/// Vietnamese phone numbers: 9 to 11 digits, optionally written `+84...`.
fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.trim().strip_prefix('+').unwrap_or_else(|| phone.trim());
    (9..=11).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Reject quantities outside `1..=MAX_LINE_QUANTITY`.
///
/// # Errors
///
/// Returns `OrderError::Validation` for an out-of-range quantity.
pub fn check_quantity(quantity: i32) -> Result<(), OrderError> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(OrderError::validation(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}"
        )))
    }
}

/// Fold repeated product/variant pairs into one line, keeping first-seen order.
fn merge_lines(items: &[LineRequest]) -> Vec<LineRequest> {
    let mut merged: Vec<LineRequest> = Vec::with_capacity(items.len());
    for item in items {
        match merged
            .iter_mut()
            .find(|m| m.product_id == item.product_id && m.variant_id == item.variant_id)
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(*item),
        }
    }
    merged
}

/// Resolve a line against current catalog data and price it.
///
/// Fails when the product is missing or hidden, when the variant belongs to
/// another product, when a product with variants is requested without one,
/// or when `quantity` exceeds current stock.
///
/// # Errors
///
/// Returns `OrderError::NotFound`, `OrderError::Validation` or
/// `OrderError::Rejected` as described above.
pub async fn price_line(
    conn: &mut PgConnection,
    line: LineRequest,
) -> Result<NewOrderItem, OrderError> {
    let stock = products::stock_line(conn, line.product_id, line.variant_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or(OrderError::NotFound("product"))?;

    if line.variant_id.is_some() && stock.variant_id.is_none() {
        return Err(OrderError::validation(format!(
            "variant does not belong to {}",
            stock.name
        )));
    }
    if line.variant_id.is_none() && stock.has_variants {
        return Err(OrderError::validation(format!(
            "please choose a variant of {}",
            stock.name
        )));
    }
    if stock.stock < line.quantity {
        return Err(OrderError::rejected(format!(
            "only {} left in stock for {}",
            stock.stock.max(0),
            stock.name
        )));
    }

    Ok(NewOrderItem {
        product_id: stock.product_id,
        variant_id: stock.variant_id,
        product_name: stock.name,
        variant_label: stock.attributes.as_ref().map(VariantAttributes::label),
        unit_price: pricing::unit_price(stock.base_price, stock.variant_price),
        quantity: line.quantity,
    })
}

/// Place an order.
///
/// Everything runs in one transaction: pricing, coupon redemption, the order
/// rows, clearing purchased cart lines and (for MoMo) creating the payment.
/// Any failure, a MoMo failure included, rolls all of it back.
///
/// # Errors
///
/// Returns `OrderError::Validation` for missing delivery fields or bad
/// quantities, `OrderError::Coupon` when the coupon does not apply,
/// `OrderError::PaymentUnavailable` when MoMo is not configured and
/// `OrderError::Payment` when MoMo refuses the payment.
#[instrument(skip(pool, momo, request), fields(user_id = %user_id))]
pub async fn place_order(
    pool: &PgPool,
    momo: Option<&MomoClient>,
    user_id: UserId,
    request: &CheckoutRequest,
) -> Result<OrderDetail, OrderError> {
    request.validate()?;
    let momo = match request.payment_method {
        PaymentMethod::Momo => Some(momo.ok_or(OrderError::PaymentUnavailable)?),
        PaymentMethod::Cod => None,
    };

    let lines = merge_lines(&request.items);
    for line in &lines {
        check_quantity(line.quantity)?;
    }

    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;

    let mut priced = Vec::with_capacity(lines.len());
    for line in &lines {
        priced.push(price_line(&mut tx, *line).await?);
    }
    let subtotal = pricing::subtotal(priced.iter().map(|l| (l.unit_price, l.quantity)));

    let coupon_code = request
        .coupon_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());
    let coupon = match coupon_code {
        Some(code) => {
            let coupon = coupons::lock_by_code(&mut tx, code)
                .await?
                .ok_or_else(|| OrderError::rejected("coupon not found"))?;
            let used = coupons::user_usage(&mut tx, coupon.id, user_id).await?;
            let discount = coupon.terms().evaluate(subtotal, used, Utc::now())?;
            Some((coupon, discount))
        }
        None => None,
    };
    let discount = coupon.as_ref().map_or(Decimal::ZERO, |(_, d)| *d);

    let order = orders::insert(
        &mut tx,
        &NewOrder {
            user_id,
            recipient_name: request.recipient_name.trim(),
            phone: request.phone.trim(),
            email: request.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
            street: request.street.trim(),
            ward: request.ward.trim(),
            district: request.district.trim(),
            province: request.province.trim(),
            note: request.note.as_deref().map(str::trim).filter(|n| !n.is_empty()),
            subtotal,
            discount,
            total: subtotal - discount,
            coupon_id: coupon.as_ref().map(|(c, _)| c.id),
            coupon_code: coupon.as_ref().map(|(c, _)| c.code.as_str()),
            payment_method: request.payment_method,
        },
    )
    .await?;
    let items = orders::insert_items(&mut tx, order.id, &priced).await?;

    if let Some((coupon, _)) = &coupon {
        coupons::consume(&mut tx, coupon.id, user_id, order.id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => CouponRejection::UsageLimitReached.into(),
                other => OrderError::from(other),
            })?;
    }

    let purchased: Vec<(ProductId, Option<VariantId>)> =
        priced.iter().map(|l| (l.product_id, l.variant_id)).collect();
    carts::remove_purchased(&mut tx, user_id, &purchased).await?;

    notifications::notify(
        &mut tx,
        user_id,
        "Order placed",
        &format!("Your order #{} has been placed.", order.id),
        Some(&order_link(order.id)),
    )
    .await?;

    let pay_url = match momo {
        Some(momo) => Some(momo.create_payment(order.id, order.total).await?.pay_url),
        None => None,
    };

    tx.commit().await.map_err(RepositoryError::from)?;

    tracing::info!(
        order_id = %order.id,
        total = %order.total,
        payment_method = %order.payment_method,
        "Order placed"
    );

    let mut detail = OrderDetail::new(order, items);
    detail.pay_url = pay_url;
    Ok(detail)
}

/// Request a fresh MoMo payment page for an unpaid pending order.
///
/// # Errors
///
/// Returns `OrderError::NotFound` if the order is not the user's,
/// `OrderError::Rejected` if it is not awaiting a MoMo payment and
/// `OrderError::Payment` if MoMo refuses.
#[instrument(skip(pool, momo), fields(user_id = %user_id, order_id = %order_id))]
pub async fn retry_payment(
    pool: &PgPool,
    momo: Option<&MomoClient>,
    user_id: UserId,
    order_id: OrderId,
) -> Result<String, OrderError> {
    let momo = momo.ok_or(OrderError::PaymentUnavailable)?;
    let order = OrderRepository::new(pool)
        .get(order_id, Some(user_id))
        .await?
        .ok_or(OrderError::NotFound("order"))?;

    if order.payment_method != PaymentMethod::Momo
        || order.payment_status != PaymentStatus::Unpaid
        || order.status != OrderStatus::Pending
    {
        return Err(OrderError::rejected("order is not awaiting a MoMo payment"));
    }

    Ok(momo.create_payment(order.id, order.total).await?.pay_url)
}

/// What a coupon would take off a subtotal.
#[derive(Debug, Serialize)]
pub struct CouponPreview {
    pub code: String,
    pub description: Option<String>,
    pub discount_percent: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Evaluate a coupon for `user_id` against `subtotal` without redeeming it.
///
/// # Errors
///
/// Returns `OrderError::Rejected` for unknown codes and `OrderError::Coupon`
/// when the coupon does not apply.
pub async fn preview_coupon(
    pool: &PgPool,
    user_id: UserId,
    code: &str,
    subtotal: Decimal,
) -> Result<CouponPreview, OrderError> {
    if subtotal < Decimal::ZERO {
        return Err(OrderError::validation("subtotal must not be negative"));
    }
    let repo = CouponRepository::new(pool);
    let coupon = repo
        .get_by_code(code)
        .await?
        .ok_or_else(|| OrderError::rejected("coupon not found"))?;
    let used = repo.user_usage(coupon.id, user_id).await?;
    let discount = coupon.terms().evaluate(subtotal, used, Utc::now())?;

    Ok(CouponPreview {
        code: coupon.code,
        description: coupon.description,
        discount_percent: coupon.discount_percent,
        discount,
        total: subtotal - discount,
    })
}

/// Storefront path of an order, used in notifications.
pub(crate) fn order_link(order_id: OrderId) -> String {
    format!("/orders/{order_id}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product: i32, variant: Option<i32>, quantity: i32) -> LineRequest {
        LineRequest {
            product_id: ProductId::new(product),
            variant_id: variant.map(VariantId::new),
            quantity,
        }
    }

    fn request() -> CheckoutRequest {
        serde_json::from_value(serde_json::json!({
            "items": [{"product_id": 1, "quantity": 2}],
            "recipient_name": "Nguyen Van A",
            "phone": "0901234567",
            "street": "12 Le Loi",
            "ward": "Ben Nghe",
            "district": "District 1",
            "province": "Ho Chi Minh City"
        }))
        .unwrap()
    }

    #[test]
    fn test_checkout_request_defaults() {
        let request = request();
        assert_eq!(request.payment_method, PaymentMethod::Cod);
        assert!(request.coupon_code.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_missing_delivery_field_is_rejected() {
        let mut request = request();
        request.ward = "  ".to_owned();
        let err = request.validate().unwrap_err();
        assert_eq!(err.to_string(), "ward is required");
    }

    #[test]
    fn test_empty_order_is_rejected() {
        let mut request = request();
        request.items.clear();
        assert!(matches!(request.validate(), Err(OrderError::Validation(_))));
    }

    #[test]
    fn test_phone_format() {
        assert!(is_valid_phone("0901234567"));
        assert!(is_valid_phone("+84901234567"));
        assert!(!is_valid_phone("090-123"));
        assert!(!is_valid_phone("12345"));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(check_quantity(0).is_err());
        assert!(check_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let merged = merge_lines(&[
            line(1, Some(10), 1),
            line(2, None, 1),
            line(1, Some(10), 2),
            line(1, Some(11), 1),
        ]);
        let quantities: Vec<i32> = merged.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![3, 1, 1]);
        assert_eq!(
            merged.last().and_then(|l| l.variant_id),
            Some(VariantId::new(11))
        );
    }

    #[test]
    fn test_order_link() {
        assert_eq!(order_link(OrderId::new(15)), "/orders/15");
    }
}
