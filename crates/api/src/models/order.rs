//! Orders and their line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use techmart_core::{
    CouponId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
    VariantId,
};

/// An order header.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub recipient_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub street: String,
    pub ward: String,
    pub district: String,
    pub province: String,
    pub note: Option<String>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub coupon_id: Option<CouponId>,
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub momo_trans_id: Option<String>,
    pub cancel_reason: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order, priced at the time of purchase.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_label: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        techmart_core::rules::pricing::line_total(self.unit_price, self.quantity)
    }
}

/// A row in order listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderListItem {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub order: Order,
    pub item_count: i64,
    pub customer_name: String,
}

/// An order with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Statuses staff may move the order to next.
    pub next_statuses: Vec<OrderStatus>,
    /// MoMo payment URL, present right after checkout or a payment retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_url: Option<String>,
}

impl OrderDetail {
    #[must_use]
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            next_statuses: order.status.next_admin_statuses(),
            order,
            items,
            pay_url: None,
        }
    }
}
