//! Status enums for orders, payments, returns and accounts.
//!
//! Each enum maps to a `PostgreSQL` enum type of the same name (with the
//! `postgres` feature) and serialises as `snake_case` in JSON.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Generates `as_str`, `Display` and `FromStr` from a variant/label table.
macro_rules! status_strings {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            /// Wire and database representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($name), ": {}"), s)),
                }
            }
        }
    };
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting confirmation.
    #[default]
    Pending,
    /// Confirmed by staff, being packed.
    Processing,
    /// Handed to the carrier; stock has been decremented.
    Shipping,
    /// Received by the customer.
    Delivered,
    /// Cancelled by the customer or staff before shipping.
    Cancelled,
    /// A return request is pending review.
    ReturnRequested,
    /// A return was approved.
    Returned,
}

status_strings!(OrderStatus {
    Pending => "pending",
    Processing => "processing",
    Shipping => "shipping",
    Delivered => "delivered",
    Cancelled => "cancelled",
    ReturnRequested => "return_requested",
    Returned => "returned",
});

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

status_strings!(PaymentStatus {
    Unpaid => "unpaid",
    Paid => "paid",
    Refunded => "refunded",
});

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    /// MoMo e-wallet.
    Momo,
}

status_strings!(PaymentMethod {
    Cod => "cod",
    Momo => "momo",
});

/// Return request review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "return_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

status_strings!(ReturnStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Why the customer is sending goods back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "return_reason", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    /// The goods arrived faulty; full refund, no restock.
    Defective,
    /// Change of mind; refund minus the restocking deduction.
    Other,
}

status_strings!(ReturnReason {
    Defective => "defective",
    Other => "other",
});

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

status_strings!(UserRole {
    Customer => "customer",
    Admin => "admin",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_serde_matches_display() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipping,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::ReturnRequested,
            OrderStatus::Returned,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("Delivered".parse::<OrderStatus>().is_err());
        assert!("bank_transfer".parse::<PaymentMethod>().is_err());
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Unpaid);
        assert_eq!(UserRole::default(), UserRole::Customer);
    }
}
