//! TechMart Core - Domain types and business rules.
//!
//! This crate provides the pieces shared by every TechMart component:
//! - `api` - The REST API serving the storefront and the admin back-office
//! - `cli` - Command-line tools for migrations and admin management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Checkout, coupon and return decisions live here so
//! they can be tested without a database; the API crate wraps them in
//! transactions.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money helpers, statuses and typed attribute maps
//! - [`rules`] - Pricing, coupon evaluation, refunds and order status transitions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod rules;
pub mod types;

pub use types::*;
