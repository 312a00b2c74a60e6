//! Return requests and their review by staff.

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use techmart_core::rules::{check_return_eligibility, refund_amount};
use techmart_core::{
    OrderId, OrderItemId, OrderStatus, PaymentStatus, ReturnReason, ReturnRequestId,
    ReturnStatus, UserId,
};

use super::OrderError;
use super::checkout::order_link;
use crate::db::returns::NewReturnItem;
use crate::db::{RepositoryError, ReturnRepository, notifications, orders, products, returns};
use crate::models::{OrderItem, ReturnDetail};

const MAX_NOTE_LENGTH: usize = 2000;

/// One order line to send back.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReturnLine {
    pub order_item_id: OrderItemId,
    pub quantity: i32,
}

/// `POST /api/orders/{id}/returns` body.
#[derive(Debug, Deserialize)]
pub struct ReturnForm {
    pub reason: ReturnReason,
    #[serde(default)]
    pub note: Option<String>,
    pub items: Vec<ReturnLine>,
}

/// Price the requested lines against what was ordered.
///
/// An approved return closes the order, so each line can be returned once, up
/// to the ordered quantity.
fn build_return_items(
    ordered: &[OrderItem],
    lines: &[ReturnLine],
    reason: ReturnReason,
) -> Result<Vec<NewReturnItem>, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::validation("choose at least one item to return"));
    }

    let mut items: Vec<NewReturnItem> = Vec::with_capacity(lines.len());
    for line in lines {
        if items.iter().any(|i| i.order_item_id == line.order_item_id) {
            return Err(OrderError::validation(format!(
                "item {} is listed more than once",
                line.order_item_id
            )));
        }
        let item = ordered
            .iter()
            .find(|i| i.id == line.order_item_id)
            .ok_or_else(|| {
                OrderError::validation(format!(
                    "item {} is not part of this order",
                    line.order_item_id
                ))
            })?;

        if line.quantity < 1 || line.quantity > item.quantity {
            return Err(OrderError::validation(format!(
                "you can return between 1 and {} of {}",
                item.quantity, item.product_name
            )));
        }

        items.push(NewReturnItem {
            order_item_id: item.id,
            quantity: line.quantity,
            unit_price: item.unit_price,
            refund_amount: refund_amount(item.unit_price, line.quantity, reason),
            is_defective: reason == ReturnReason::Defective,
        });
    }
    Ok(items)
}

/// Open a return for one of the user's delivered orders.
///
/// # Errors
///
/// Returns `OrderError::NotFound` if the order is not the user's,
/// `OrderError::ReturnIneligible` outside the return window or for unpaid or
/// undelivered orders, `OrderError::Validation` for bad lines and
/// `OrderError::Repository` with a conflict if a return is already pending.
#[instrument(skip(pool, form), fields(user_id = %user_id, order_id = %order_id))]
pub async fn request_return(
    pool: &PgPool,
    user_id: UserId,
    order_id: OrderId,
    form: &ReturnForm,
) -> Result<ReturnDetail, OrderError> {
    let note = form.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
    if note.is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH) {
        return Err(OrderError::validation(format!(
            "note must be at most {MAX_NOTE_LENGTH} characters"
        )));
    }

    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;

    let order = orders::lock(&mut tx, order_id)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or(OrderError::NotFound("order"))?;
    check_return_eligibility(
        order.status,
        order.payment_status,
        order.delivered_at,
        Utc::now(),
    )?;

    let ordered = orders::items(&mut tx, order_id).await?;
    let items = build_return_items(&ordered, &form.items, form.reason)?;

    let request = returns::insert(&mut tx, order_id, user_id, form.reason, note, &items).await?;
    orders::transition(
        &mut tx,
        order_id,
        OrderStatus::Delivered,
        OrderStatus::ReturnRequested,
    )
    .await?;
    notifications::notify(
        &mut tx,
        user_id,
        "Return requested",
        &format!(
            "We received your return request for order #{order_id}. Refund: {} VND.",
            request.refund_amount
        ),
        Some(&order_link(order_id)),
    )
    .await?;

    tx.commit().await.map_err(RepositoryError::from)?;
    tracing::info!(return_id = %request.id, refund = %request.refund_amount, "Return requested");

    ReturnRepository::new(pool)
        .get(request.id, Some(user_id))
        .await?
        .ok_or(OrderError::NotFound("return request"))
}

/// Approve a pending return: non-defective items go back into stock, the
/// order becomes `returned` and its payment `refunded`.
///
/// # Errors
///
/// Returns `OrderError::Repository` with `NotFound` for an unknown request
/// and `Conflict` if it was already processed.
#[instrument(skip(pool, admin_note), fields(return_id = %id))]
pub async fn approve(
    pool: &PgPool,
    id: ReturnRequestId,
    admin_note: Option<&str>,
) -> Result<ReturnDetail, OrderError> {
    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;

    let request = returns::decide(&mut tx, id, ReturnStatus::Approved, admin_note).await?;
    for line in returns::restock_lines(&mut tx, id).await? {
        if line.is_defective {
            continue;
        }
        if let Some(product_id) = line.product_id {
            products::restock(&mut tx, product_id, line.variant_id, line.quantity).await?;
        }
    }
    orders::set_return_outcome(
        &mut tx,
        request.order_id,
        OrderStatus::Returned,
        Some(PaymentStatus::Refunded),
    )
    .await?;
    notifications::notify(
        &mut tx,
        request.user_id,
        "Return approved",
        &format!(
            "Your return for order #{} was approved. {} VND will be refunded.",
            request.order_id, request.refund_amount
        ),
        Some(&order_link(request.order_id)),
    )
    .await?;

    tx.commit().await.map_err(RepositoryError::from)?;
    tracing::info!(order_id = %request.order_id, "Return approved");

    load(pool, id).await
}

/// Reject a pending return; the order goes back to `delivered`.
///
/// # Errors
///
/// Returns `OrderError::Repository` with `NotFound` for an unknown request
/// and `Conflict` if it was already processed.
#[instrument(skip(pool, admin_note), fields(return_id = %id))]
pub async fn reject(
    pool: &PgPool,
    id: ReturnRequestId,
    admin_note: Option<&str>,
) -> Result<ReturnDetail, OrderError> {
    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;

    let request = returns::decide(&mut tx, id, ReturnStatus::Rejected, admin_note).await?;
    orders::set_return_outcome(&mut tx, request.order_id, OrderStatus::Delivered, None).await?;
    notifications::notify(
        &mut tx,
        request.user_id,
        "Return rejected",
        &format!(
            "Your return for order #{} was not accepted.{}",
            request.order_id,
            admin_note.map(|n| format!(" {n}")).unwrap_or_default()
        ),
        Some(&order_link(request.order_id)),
    )
    .await?;

    tx.commit().await.map_err(RepositoryError::from)?;
    tracing::info!(order_id = %request.order_id, "Return rejected");

    load(pool, id).await
}

async fn load(pool: &PgPool, id: ReturnRequestId) -> Result<ReturnDetail, OrderError> {
    ReturnRepository::new(pool)
        .get(id, None)
        .await?
        .ok_or(OrderError::NotFound("return request"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use techmart_core::{ProductId, VariantId};

    use super::*;

    fn ordered() -> Vec<OrderItem> {
        vec![
            OrderItem {
                id: OrderItemId::new(1),
                order_id: OrderId::new(9),
                product_id: Some(ProductId::new(3)),
                variant_id: Some(VariantId::new(30)),
                product_name: "Galaxy S24".to_owned(),
                variant_label: Some("Black / 256GB".to_owned()),
                unit_price: Decimal::new(1_500_000, 0),
                quantity: 2,
            },
            OrderItem {
                id: OrderItemId::new(2),
                order_id: OrderId::new(9),
                product_id: Some(ProductId::new(4)),
                variant_id: None,
                product_name: "USB-C cable".to_owned(),
                variant_label: None,
                unit_price: Decimal::new(99_000, 0),
                quantity: 1,
            },
        ]
    }

    fn line(id: i32, quantity: i32) -> ReturnLine {
        ReturnLine {
            order_item_id: OrderItemId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_defective_return_refunds_in_full() {
        let items = build_return_items(&ordered(), &[line(1, 2)], ReturnReason::Defective).unwrap();
        let item = items.first().unwrap();
        assert_eq!(item.refund_amount, Decimal::new(3_000_000, 0));
        assert!(item.is_defective);
    }

    #[test]
    fn test_change_of_mind_deducts_twenty_percent() {
        let items = build_return_items(&ordered(), &[line(1, 2)], ReturnReason::Other).unwrap();
        let item = items.first().unwrap();
        assert_eq!(item.refund_amount, Decimal::new(2_400_000, 0));
        assert!(!item.is_defective);
    }

    #[test]
    fn test_quantity_capped_by_ordered_quantity() {
        assert!(build_return_items(&ordered(), &[line(1, 1)], ReturnReason::Other).is_ok());
        assert!(matches!(
            build_return_items(&ordered(), &[line(1, 3)], ReturnReason::Other),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn test_foreign_and_duplicate_lines_are_rejected() {
        assert!(build_return_items(&ordered(), &[line(7, 1)], ReturnReason::Other).is_err());
        assert!(
            build_return_items(&ordered(), &[line(2, 1), line(2, 1)], ReturnReason::Other).is_err()
        );
        assert!(build_return_items(&ordered(), &[], ReturnReason::Other).is_err());
        assert!(build_return_items(&ordered(), &[line(2, 0)], ReturnReason::Other).is_err());
    }
}
