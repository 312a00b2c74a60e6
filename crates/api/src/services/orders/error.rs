//! Order workflow error types.

use thiserror::Error;

use techmart_core::rules::{CouponRejection, ReturnIneligible};

use crate::db::RepositoryError;
use crate::services::momo::MomoError;

/// Errors raised by checkout, order management and returns.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed input (missing delivery fields, bad quantities).
    #[error("{0}")]
    Validation(String),

    /// A business rule refused the operation.
    #[error("{0}")]
    Rejected(String),

    /// The coupon cannot be applied to this order.
    #[error(transparent)]
    Coupon(#[from] CouponRejection),

    /// The order cannot be returned.
    #[error(transparent)]
    ReturnIneligible(#[from] ReturnIneligible),

    /// Order, item or return not found (or not owned by the caller).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// MoMo checkout was requested but is not configured.
    #[error("MoMo payments are not available")]
    PaymentUnavailable,

    /// MoMo refused the payment or could not be reached.
    #[error(transparent)]
    Payment(#[from] MomoError),

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl OrderError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}
