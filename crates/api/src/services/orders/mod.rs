//! Order workflows: checkout, cancellation, staff status updates and returns.
//!
//! Each workflow runs in one transaction. Status changes go through the
//! conditional updates in [`crate::db::orders`], so a lost race surfaces as
//! `RepositoryError::Conflict` (409) rather than a double apply.

pub mod checkout;
mod error;
pub mod returns;

pub use checkout::{CheckoutRequest, CouponPreview, LineRequest, MAX_LINE_QUANTITY};
pub use error::OrderError;

use sqlx::PgPool;
use tracing::instrument;

use techmart_core::{OrderId, OrderStatus, UserId};

use crate::db::{RepositoryError, UserRepository, coupons, notifications, orders, products};
use crate::models::{Order, OrderDetail};
use crate::services::email::{EmailService, status_label};
use checkout::order_link;

/// Order lifecycle after checkout.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    email: Option<&'a EmailService>,
    frontend_url: &'a str,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: Option<&'a EmailService>, frontend_url: &'a str) -> Self {
        Self {
            pool,
            email,
            frontend_url,
        }
    }

    /// Cancel one of the user's pending orders.
    ///
    /// Paid orders flip to refunded and the coupon redemption, if any, is
    /// given back.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order is not the user's,
    /// `OrderError::Rejected` if it is past `pending` and
    /// `OrderError::Repository` with a conflict if it changed concurrently.
    #[instrument(skip(self, reason), fields(user_id = %user_id, order_id = %order_id))]
    pub async fn cancel(
        &self,
        user_id: UserId,
        order_id: OrderId,
        reason: Option<&str>,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let order = orders::lock(&mut tx, order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(OrderError::NotFound("order"))?;
        if !order.status.can_cancel() {
            return Err(OrderError::rejected(
                "only pending orders can be cancelled",
            ));
        }

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let order = orders::cancel(&mut tx, order_id, reason).await?;
        coupons::release(&mut tx, order_id).await?;
        notifications::notify(
            &mut tx,
            user_id,
            "Order cancelled",
            &format!("Your order #{order_id} has been cancelled."),
            Some(&order_link(order_id)),
        )
        .await?;

        tx.commit().await.map_err(RepositoryError::from)?;
        tracing::info!(payment_status = %order.payment_status, "Order cancelled by customer");

        Ok(order)
    }

    /// Move an order to `next` on behalf of staff.
    ///
    /// Shipping takes the ordered quantities out of stock; cancelling gives
    /// back the coupon redemption. The customer is notified in-app and, when
    /// email is configured, by email.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist,
    /// `OrderError::Rejected` if the transition is not allowed and
    /// `OrderError::Repository` with a conflict when stock has run out or the
    /// order changed concurrently.
    #[instrument(skip(self), fields(order_id = %order_id, next = %next))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<OrderDetail, OrderError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let current = orders::lock(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound("order"))?;
        if !current.status.admin_transition_allowed(next) {
            return Err(OrderError::rejected(format!(
                "cannot move an order from {} to {next}",
                current.status
            )));
        }

        let items = orders::items(&mut tx, order_id).await?;
        if next == OrderStatus::Shipping {
            for item in &items {
                if let Some(product_id) = item.product_id {
                    products::take_stock(&mut tx, product_id, item.variant_id, item.quantity)
                        .await?;
                }
            }
        }

        let order = orders::transition(&mut tx, order_id, current.status, next).await?;
        if next == OrderStatus::Cancelled {
            coupons::release(&mut tx, order_id).await?;
        }
        notifications::notify(
            &mut tx,
            order.user_id,
            &format!("Order #{order_id}: {}", status_label(next)),
            &format!("Your order #{order_id} is now {}.", status_label(next).to_lowercase()),
            Some(&order_link(order_id)),
        )
        .await?;

        tx.commit().await.map_err(RepositoryError::from)?;
        tracing::info!(from = %current.status, "Order status updated");

        self.email_status(&order).await;
        Ok(OrderDetail::new(order, items))
    }

    /// Email the customer about their order's new status. Failures are
    /// logged; the status change has already been committed.
    async fn email_status(&self, order: &Order) {
        let Some(email) = self.email else {
            tracing::debug!(order_id = %order.id, "Email disabled, skipping status email");
            return;
        };

        let user = match UserRepository::new(self.pool).get_by_id(order.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Could not load customer for status email");
                return;
            }
        };

        let to = order.email.as_deref().unwrap_or_else(|| user.email.as_str());
        let order_url = format!(
            "{}{}",
            self.frontend_url.trim_end_matches('/'),
            order_link(order.id)
        );
        if let Err(e) = email
            .send_order_status(to, &user.name, order.id.as_i32(), order.status, &order_url)
            .await
        {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to send order status email");
        }
    }
}
