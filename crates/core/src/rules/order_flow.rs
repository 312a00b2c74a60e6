//! Order status transitions.

use crate::OrderStatus;

impl OrderStatus {
    /// Whether the customer may still cancel.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether staff may move an order from `self` to `next`.
    ///
    /// Return statuses are only reachable through the return workflow.
    #[must_use]
    pub const fn admin_transition_allowed(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipping | Self::Cancelled)
                | (Self::Shipping, Self::Delivered)
        )
    }

    /// Statuses staff may move to from here.
    #[must_use]
    pub fn next_admin_statuses(self) -> Vec<Self> {
        [
            Self::Processing,
            Self::Shipping,
            Self::Delivered,
            Self::Cancelled,
        ]
        .into_iter()
        .filter(|next| self.admin_transition_allowed(*next))
        .collect()
    }

    /// Whether the order is finished and no longer changes through staff actions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_cancel_only_pending() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(!OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipping.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_admin_transitions() {
        assert!(OrderStatus::Pending.admin_transition_allowed(OrderStatus::Processing));
        assert!(OrderStatus::Processing.admin_transition_allowed(OrderStatus::Cancelled));
        assert!(OrderStatus::Shipping.admin_transition_allowed(OrderStatus::Delivered));

        assert!(!OrderStatus::Pending.admin_transition_allowed(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipping.admin_transition_allowed(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.admin_transition_allowed(OrderStatus::Returned));
        assert!(!OrderStatus::Delivered.admin_transition_allowed(OrderStatus::ReturnRequested));
    }

    #[test]
    fn test_next_admin_statuses() {
        assert_eq!(
            OrderStatus::Processing.next_admin_statuses(),
            vec![OrderStatus::Shipping, OrderStatus::Cancelled]
        );
        assert!(OrderStatus::Delivered.next_admin_statuses().is_empty());
    }
}
