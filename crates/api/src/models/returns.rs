//! Return requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use techmart_core::{
    OrderId, OrderItemId, ReturnItemId, ReturnReason, ReturnRequestId, ReturnStatus, UserId,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReturnRequest {
    pub id: ReturnRequestId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub reason: ReturnReason,
    pub note: Option<String>,
    pub status: ReturnStatus,
    pub refund_amount: Decimal,
    pub admin_note: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A returned line joined with the order item it refers to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReturnItem {
    pub id: ReturnItemId,
    pub order_item_id: OrderItemId,
    pub product_name: String,
    pub variant_label: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub refund_amount: Decimal,
    pub is_defective: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnDetail {
    #[serde(flatten)]
    pub request: ReturnRequest,
    pub items: Vec<ReturnItem>,
}
