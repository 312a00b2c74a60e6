//! Return request repository.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};

use techmart_core::{
    OrderId, OrderItemId, ProductId, ReturnReason, ReturnRequestId, ReturnStatus, UserId,
    VariantId,
};

use super::RepositoryError;
use crate::models::{ReturnDetail, ReturnItem, ReturnRequest};
use crate::response::PageParams;

macro_rules! return_columns {
    () => {
        "id, order_id, user_id, reason, note, status, refund_amount, admin_note, processed_at, \
         created_at"
    };
}

/// Return listing filters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ReturnFilter {
    pub status: Option<ReturnStatus>,
    #[serde(skip)]
    pub user_id: Option<UserId>,
}

/// A line to refund, priced by the caller.
#[derive(Debug, Clone)]
pub struct NewReturnItem {
    pub order_item_id: OrderItemId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub refund_amount: Decimal,
    pub is_defective: bool,
}

/// What an approved return puts back on the shelf.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RestockLine {
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
    pub is_defective: bool,
}

pub struct ReturnRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReturnRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of return requests, newest first, and the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: ReturnFilter,
        page: PageParams,
    ) -> Result<(Vec<ReturnRequest>, i64), RepositoryError> {
        let items = sqlx::query_as::<_, ReturnRequest>(concat!(
            "SELECT ",
            return_columns!(),
            " FROM return_requests \
             WHERE ($1::return_status IS NULL OR status = $1) AND ($2::int IS NULL OR user_id = $2) \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filter.status)
        .bind(filter.user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM return_requests \
             WHERE ($1::return_status IS NULL OR status = $1) AND ($2::int IS NULL OR user_id = $2)",
        )
        .bind(filter.status)
        .bind(filter.user_id)
        .fetch_one(self.pool)
        .await?;

        Ok((items, total))
    }

    /// A return request with its items, optionally only if owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        id: ReturnRequestId,
        owner: Option<UserId>,
    ) -> Result<Option<ReturnDetail>, RepositoryError> {
        let Some(request) = sqlx::query_as::<_, ReturnRequest>(concat!(
            "SELECT ",
            return_columns!(),
            " FROM return_requests WHERE id = $1 AND ($2::int IS NULL OR user_id = $2)"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, ReturnItem>(
            "SELECT ri.id, ri.order_item_id, oi.product_name, oi.variant_label, ri.quantity, \
             ri.unit_price, ri.refund_amount, ri.is_defective \
             FROM return_items ri JOIN order_items oi ON oi.id = ri.order_item_id \
             WHERE ri.return_request_id = $1 ORDER BY ri.id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(ReturnDetail { request, items }))
    }
}

/// Insert a pending return with its items.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order already has a pending
/// return.
pub async fn insert(
    conn: &mut PgConnection,
    order_id: OrderId,
    user_id: UserId,
    reason: ReturnReason,
    note: Option<&str>,
    items: &[NewReturnItem],
) -> Result<ReturnRequest, RepositoryError> {
    let refund_total: Decimal = items.iter().map(|i| i.refund_amount).sum();

    let request = sqlx::query_as::<_, ReturnRequest>(concat!(
        "INSERT INTO return_requests (order_id, user_id, reason, note, refund_amount) \
         VALUES ($1, $2, $3, $4, $5) RETURNING ",
        return_columns!()
    ))
    .bind(order_id)
    .bind(user_id)
    .bind(reason)
    .bind(note)
    .bind(refund_total)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::unique(e, "a return for this order is already pending"))?;

    for item in items {
        sqlx::query(
            "INSERT INTO return_items (return_request_id, order_item_id, quantity, unit_price, \
             refund_amount, is_defective) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(request.id)
        .bind(item.order_item_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.refund_amount)
        .bind(item.is_defective)
        .execute(&mut *conn)
        .await?;
    }

    Ok(request)
}

/// Decide a pending return.
///
/// The update only matches a pending request, so two staff members acting
/// at once cannot both apply it.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the request does not exist.
/// Returns `RepositoryError::Conflict` if it was already processed.
pub async fn decide(
    conn: &mut PgConnection,
    id: ReturnRequestId,
    status: ReturnStatus,
    admin_note: Option<&str>,
) -> Result<ReturnRequest, RepositoryError> {
    let decided = sqlx::query_as::<_, ReturnRequest>(concat!(
        "UPDATE return_requests SET status = $2, admin_note = $3, processed_at = NOW() \
         WHERE id = $1 AND status = 'pending' RETURNING ",
        return_columns!()
    ))
    .bind(id)
    .bind(status)
    .bind(admin_note)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(request) = decided {
        return Ok(request);
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM return_requests WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    if exists {
        Err(RepositoryError::Conflict(
            "return request has already been processed".to_owned(),
        ))
    } else {
        Err(RepositoryError::NotFound)
    }
}

/// The items of a return with the product and variant they restock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn restock_lines(
    conn: &mut PgConnection,
    id: ReturnRequestId,
) -> Result<Vec<RestockLine>, RepositoryError> {
    let lines = sqlx::query_as::<_, RestockLine>(
        "SELECT oi.product_id, oi.variant_id, ri.quantity, ri.is_defective \
         FROM return_items ri JOIN order_items oi ON oi.id = ri.order_item_id \
         WHERE ri.return_request_id = $1 ORDER BY ri.id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}
