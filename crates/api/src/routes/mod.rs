//! HTTP route handlers for the TechMart API.
//!
//! Every JSON response uses the `{ "success": .., "data" | "error": .. }`
//! envelope from [`crate::response`].
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (database ping)
//!
//! # Auth (stricter rate limit)
//! POST /api/auth/register                   - Create an account
//! POST /api/auth/login                      - Email + password login
//! POST /api/auth/google                     - Google ID token login
//! POST /api/auth/forgot-password            - Email a reset link
//! POST /api/auth/reset-password             - Set a password from a reset token
//! GET  /api/auth/me                         - Current user
//! PUT  /api/auth/me                         - Update profile
//! POST /api/auth/change-password            - Change password
//!
//! # Catalog
//! GET  /api/categories[/{id}]               - Active categories
//! GET  /api/brands[/{id}]                   - Brands, optionally by category
//! GET  /api/products                        - Filtered, sorted product listing
//! GET  /api/products/{id}                   - Product with variants and images
//! GET  /api/products/{id}/reviews           - Visible reviews and rating
//! POST /api/products/{id}/reviews           - Review a purchased product
//! DELETE /api/reviews/{id}                  - Delete own review
//!
//! # Shopping (requires auth)
//! GET|POST|DELETE /api/cart                 - Cart
//! PUT|DELETE /api/cart/{id}                 - Cart line
//! GET|POST /api/wishlist                    - Wishlist
//! DELETE /api/wishlist/{product_id}         - Remove from wishlist
//! GET|POST /api/addresses                   - Address book
//! PUT|DELETE /api/addresses/{id}            - Address
//! POST /api/addresses/{id}/default          - Make default
//! POST /api/coupons/validate                - Preview a coupon
//!
//! # Orders (requires auth)
//! GET|POST /api/orders                      - History, checkout
//! GET  /api/orders/{id}                     - Order detail
//! POST /api/orders/{id}/cancel              - Cancel a pending order
//! POST /api/orders/{id}/pay                 - New MoMo payment URL
//! POST /api/orders/{id}/returns             - Request a return
//! GET  /api/returns[/{id}]                  - Own return requests
//! GET  /api/notifications                   - Notifications
//! GET  /api/notifications/unread-count      - Unread count
//! POST /api/notifications/read-all          - Mark all read
//! POST /api/notifications/{id}/read         - Mark one read
//! DELETE /api/notifications/{id}            - Delete one
//!
//! # Public
//! POST /api/newsletter/subscribe            - Subscribe
//! POST /api/newsletter/unsubscribe          - Unsubscribe
//! POST /api/payments/momo/ipn               - MoMo payment notification (not rate limited)
//!
//! # Admin (requires admin role)
//! GET  /api/admin/dashboard                 - Store statistics
//! GET|PUT /api/admin/users[/{id}]           - Users, role and active flag
//! POST|PUT|DELETE /api/admin/categories     - Categories
//! POST|PUT|DELETE /api/admin/brands         - Brands
//! GET|POST|PUT|DELETE /api/admin/products   - Products
//! POST /api/admin/products/{id}/variants    - Add variant
//! PUT|DELETE /api/admin/variants/{id}       - Variant
//! POST /api/admin/products/{id}/images      - Add image
//! DELETE /api/admin/images/{id}             - Remove image
//! GET  /api/admin/orders[/{id}]             - Orders
//! PUT  /api/admin/orders/{id}/status        - Advance an order
//! GET  /api/admin/returns[/{id}]            - Return requests
//! POST /api/admin/returns/{id}/approve      - Approve and refund
//! POST /api/admin/returns/{id}/reject       - Reject
//! GET|POST|PUT|DELETE /api/admin/coupons    - Coupons
//! GET  /api/admin/coupons/{id}/usages       - Redemptions
//! GET  /api/admin/reviews                   - All reviews
//! PUT  /api/admin/reviews/{id}/visibility   - Hide or show
//! DELETE /api/admin/reviews/{id}            - Delete
//! POST /api/admin/notifications/broadcast   - Notify every active user
//! GET  /api/admin/newsletter/subscribers    - Subscribers
//! POST /api/admin/newsletter/send           - Email a campaign
//! ```

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod health;
pub mod newsletter;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod returns;
pub mod reviews;
pub mod wishlist;

use axum::Router;

use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Trim a required text field, rejecting blank input.
pub(crate) fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

/// Trim an optional text field; blank counts as absent.
pub(crate) fn optional_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Build the full route tree.
///
/// Health checks and the MoMo IPN callback are not rate limited. Auth
/// endpoints get the strict limiter, everything else the general one.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog::router())
        .merge(reviews::router())
        .merge(cart::router())
        .merge(wishlist::router())
        .merge(addresses::router())
        .merge(coupons::router())
        .merge(orders::router())
        .merge(returns::router())
        .merge(notifications::router())
        .merge(newsletter::router())
        .merge(admin::router())
        .layer(api_rate_limiter());

    Router::new()
        .merge(health::router())
        .merge(payments::router())
        .merge(auth::router().layer(auth_rate_limiter()))
        .merge(api)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("name", "  Minh  ").unwrap(), "Minh");
        let err = required("name", " \t ").unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "name is required"));
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some(" note ")), Some("note"));
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(optional_text(None), None);
    }
}
