//! Order repository.
//!
//! Status changes are conditional updates on the expected current status, so
//! a double submission or a race with staff changes zero rows and surfaces as
//! a conflict instead of applying twice.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use techmart_core::{
    CouponId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId, VariantId,
};

use super::{RepositoryError, like_pattern};
use crate::models::{Order, OrderItem, OrderListItem};
use crate::response::PageParams;

macro_rules! order_columns {
    () => {
        "o.id, o.user_id, o.recipient_name, o.phone, o.email, o.street, o.ward, o.district, \
         o.province, o.note, o.subtotal, o.discount, o.total, o.coupon_id, o.coupon_code, \
         o.status, o.payment_method, o.payment_status, o.momo_trans_id, o.cancel_reason, \
         o.delivered_at, o.cancelled_at, o.created_at, o.updated_at"
    };
}

macro_rules! list_select {
    () => {
        concat!(
            "SELECT ",
            order_columns!(),
            ", (SELECT COUNT(*) FROM order_items oi WHERE oi.order_id = o.id) AS item_count, \
             u.name AS customer_name FROM orders o JOIN users u ON u.id = o.user_id"
        )
    };
}

/// Order listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Matches the order number, recipient, phone or customer name.
    pub q: Option<String>,
    /// Restricts the listing to one customer.
    #[serde(skip)]
    pub user_id: Option<UserId>,
}

impl OrderFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(user_id) = self.user_id {
            qb.push(" AND o.user_id = ").push_bind(user_id);
        }
        if let Some(status) = self.status {
            qb.push(" AND o.status = ").push_bind(status);
        }
        if let Some(payment_status) = self.payment_status {
            qb.push(" AND o.payment_status = ").push_bind(payment_status);
        }
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = like_pattern(q);
            qb.push(" AND (o.id::text = ")
                .push_bind(q.trim_start_matches('#').to_owned())
                .push(" OR o.recipient_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR o.phone ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// An order header about to be inserted.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub user_id: UserId,
    pub recipient_name: &'a str,
    pub phone: &'a str,
    pub email: Option<&'a str>,
    pub street: &'a str,
    pub ward: &'a str,
    pub district: &'a str,
    pub province: &'a str,
    pub note: Option<&'a str>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub coupon_id: Option<CouponId>,
    pub coupon_code: Option<&'a str>,
    pub payment_method: PaymentMethod,
}

/// A priced line about to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_label: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of orders matching `filter`, newest first, and the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: PageParams,
    ) -> Result<(Vec<OrderListItem>, i64), RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(list_select!());
        filter.push_where(&mut qb);
        qb.push(" ORDER BY o.created_at DESC, o.id DESC");
        qb.push(" LIMIT ").push_bind(page.limit());
        qb.push(" OFFSET ").push_bind(page.offset());
        let items = qb
            .build_query_as::<OrderListItem>()
            .fetch_all(self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id",
        );
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((items, total))
    }

    /// The most recent orders across all customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<OrderListItem>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderListItem>(concat!(
            list_select!(),
            " ORDER BY o.created_at DESC, o.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Get an order, optionally only if it belongs to `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: OrderId,
        owner: Option<UserId>,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders o WHERE o.id = $1 AND ($2::int IS NULL OR o.user_id = $2)"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Line items of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        items(&mut conn, order_id).await
    }

    /// Record a successful MoMo payment.
    ///
    /// Only an unpaid order flips to paid, so a replayed IPN is a no-op.
    /// Returns whether the order changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_paid(&self, id: OrderId, trans_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_status = 'paid', momo_trans_id = $2, updated_at = NOW() \
             WHERE id = $1 AND payment_status = 'unpaid' AND payment_method = 'momo' \
             AND status NOT IN ('cancelled', 'returned')",
        )
        .bind(id)
        .bind(trans_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Insert an order header.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(conn: &mut PgConnection, new: &NewOrder<'_>) -> Result<Order, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(concat!(
        "INSERT INTO orders AS o (user_id, recipient_name, phone, email, street, ward, \
         district, province, note, subtotal, discount, total, coupon_id, coupon_code, \
         payment_method) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING ",
        order_columns!()
    ))
    .bind(new.user_id)
    .bind(new.recipient_name)
    .bind(new.phone)
    .bind(new.email)
    .bind(new.street)
    .bind(new.ward)
    .bind(new.district)
    .bind(new.province)
    .bind(new.note)
    .bind(new.subtotal)
    .bind(new.discount)
    .bind(new.total)
    .bind(new.coupon_id)
    .bind(new.coupon_code)
    .bind(new.payment_method)
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

/// Insert the line items of an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    lines: &[NewOrderItem],
) -> Result<Vec<OrderItem>, RepositoryError> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = sqlx::query_as::<_, OrderItem>(
            "INSERT INTO order_items (order_id, product_id, variant_id, product_name, \
             variant_label, unit_price, quantity) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, order_id, product_id, variant_id, product_name, variant_label, \
             unit_price, quantity",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.variant_id)
        .bind(&line.product_name)
        .bind(line.variant_label.as_deref())
        .bind(line.unit_price)
        .bind(line.quantity)
        .fetch_one(&mut *conn)
        .await?;
        items.push(item);
    }
    Ok(items)
}

/// Line items of an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<OrderItem>, RepositoryError> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, variant_id, product_name, variant_label, unit_price, \
         quantity FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Lock an order row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(conn: &mut PgConnection, id: OrderId) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(concat!(
        "SELECT ",
        order_columns!(),
        " FROM orders o WHERE o.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(order)
}

/// Move an order from `from` to `to`, stamping the matching timestamp.
///
/// Delivering a cash-on-delivery order also marks it paid.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order is no longer in `from`.
pub async fn transition(
    conn: &mut PgConnection,
    id: OrderId,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(concat!(
        "UPDATE orders AS o SET status = $3, updated_at = NOW(), \
         delivered_at = CASE WHEN $3 = 'delivered'::order_status THEN NOW() ELSE o.delivered_at END, \
         cancelled_at = CASE WHEN $3 = 'cancelled'::order_status THEN NOW() ELSE o.cancelled_at END, \
         payment_status = CASE \
           WHEN $3 = 'delivered'::order_status AND o.payment_method = 'cod' THEN 'paid'::payment_status \
           WHEN $3 = 'cancelled'::order_status AND o.payment_status = 'paid' THEN 'refunded'::payment_status \
           ELSE o.payment_status END \
         WHERE o.id = $1 AND o.status = $2 RETURNING ",
        order_columns!()
    ))
    .bind(id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepositoryError::Conflict(format!("order is no longer {from}")))
}

/// Cancel a pending order on behalf of its owner.
///
/// Paid orders flip to refunded.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order is not pending any more.
pub async fn cancel(
    conn: &mut PgConnection,
    id: OrderId,
    reason: Option<&str>,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(concat!(
        "UPDATE orders AS o SET status = 'cancelled', cancelled_at = NOW(), cancel_reason = $2, \
         payment_status = CASE WHEN o.payment_status = 'paid' THEN 'refunded'::payment_status \
                          ELSE o.payment_status END, \
         updated_at = NOW() \
         WHERE o.id = $1 AND o.status = 'pending' RETURNING ",
        order_columns!()
    ))
    .bind(id)
    .bind(reason)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepositoryError::Conflict("order can no longer be cancelled".to_owned()))
}

/// Set an order's status after a return decision.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_return_outcome(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
    payment_status: Option<PaymentStatus>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE orders SET status = $2, payment_status = COALESCE($3, payment_status), \
         updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(status)
    .bind(payment_status)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_filter_scopes_to_user() {
        let filter = OrderFilter {
            status: Some(OrderStatus::Pending),
            user_id: Some(UserId::new(7)),
            ..OrderFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM orders o");
        filter.push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM orders o WHERE TRUE AND o.user_id = $1 AND o.status = $2"
        );
    }

    #[test]
    fn test_search_matches_number_and_names() {
        let filter = OrderFilter {
            q: Some(" #42 ".to_owned()),
            ..OrderFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM orders o");
        filter.push_where(&mut qb);
        assert!(qb.sql().contains("o.id::text = $1"));
        assert!(qb.sql().contains("u.name ILIKE $4"));
    }
}
