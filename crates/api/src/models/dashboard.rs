//! Admin dashboard figures.

use rust_decimal::Decimal;
use serde::Serialize;

use techmart_core::{OrderStatus, ProductId};

use super::OrderListItem;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopSeller {
    pub id: ProductId,
    pub name: String,
    pub sold_count: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Paid revenue excluding cancelled and returned orders.
    pub revenue: Decimal,
    pub orders_by_status: Vec<StatusCount>,
    pub customer_count: i64,
    pub product_count: i64,
    pub low_stock: Vec<LowStockProduct>,
    pub top_sellers: Vec<TopSeller>,
    pub recent_orders: Vec<OrderListItem>,
}
