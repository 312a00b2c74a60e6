//! Aggregates for the admin dashboard.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{OrderRepository, RepositoryError};
use crate::models::{Dashboard, LowStockProduct, StatusCount, TopSeller};

/// Products at or below this stock level are flagged.
pub const LOW_STOCK_THRESHOLD: i32 = 5;
const LIST_LIMIT: i64 = 10;

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Collect every dashboard figure.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn load(&self) -> Result<Dashboard, RepositoryError> {
        let revenue: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total), 0) FROM orders \
             WHERE payment_status = 'paid' AND status NOT IN ('cancelled', 'returned')",
        )
        .fetch_one(self.pool)
        .await?;

        let orders_by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;

        let customer_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'customer'")
                .fetch_one(self.pool)
                .await?;

        let product_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;

        let low_stock = sqlx::query_as::<_, LowStockProduct>(
            "SELECT id, name, stock FROM products WHERE is_active AND stock <= $1 \
             ORDER BY stock, name LIMIT $2",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .bind(LIST_LIMIT)
        .fetch_all(self.pool)
        .await?;

        let top_sellers = sqlx::query_as::<_, TopSeller>(
            "SELECT id, name, sold_count, price FROM products WHERE sold_count > 0 \
             ORDER BY sold_count DESC, id LIMIT $1",
        )
        .bind(LIST_LIMIT)
        .fetch_all(self.pool)
        .await?;

        let recent_orders = OrderRepository::new(self.pool).recent(LIST_LIMIT).await?;

        Ok(Dashboard {
            revenue,
            orders_by_status,
            customer_count,
            product_count,
            low_stock,
            top_sellers,
            recent_orders,
        })
    }
}
