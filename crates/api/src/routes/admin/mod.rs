//! Back-office route handlers under `/api/admin`.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin),
//! which re-reads the role from the database on each request.

mod catalog;
mod coupons;
mod dashboard;
mod newsletter;
mod notifications;
mod orders;
mod returns;
mod reviews;
mod users;

use axum::Router;

use crate::state::AppState;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(dashboard::router())
        .merge(users::router())
        .merge(catalog::router())
        .merge(orders::router())
        .merge(returns::router())
        .merge(coupons::router())
        .merge(reviews::router())
        .merge(notifications::router())
        .merge(newsletter::router())
}
