//! Business rules shared by checkout, order management and returns.
//!
//! Everything here is pure: callers load the rows, these functions decide.

pub mod coupon;
pub mod order_flow;
pub mod pricing;
pub mod refund;

pub use coupon::{CouponRejection, CouponTerms};
pub use refund::{RETURN_WINDOW_DAYS, ReturnIneligible, check_return_eligibility, refund_amount};
