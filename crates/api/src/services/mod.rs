//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password and Google sign-in, bearer tokens, password resets
//! - `email` - Transactional email (password reset, order status, newsletter)
//! - `momo` - MoMo e-wallet payment creation and IPN verification
//! - `orders` - Checkout, cancellation, staff status updates and returns

pub mod auth;
pub mod email;
pub mod momo;
pub mod orders;
