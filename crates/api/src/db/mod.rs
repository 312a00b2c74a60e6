//! Database operations for the TechMart `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users`, `password_reset_tokens`, `addresses`, `notifications`
//! - `categories`, `brands`, `brand_categories`, `products`,
//!   `product_variants`, `product_images`, `reviews`
//! - `cart_items`, `wishlist_items`
//! - `coupons`, `coupon_usages`
//! - `orders`, `order_items`, `return_requests`, `return_items`
//! - `newsletter_subscribers`
//!
//! Repositories borrow the pool for simple reads and writes. Functions that
//! take a `&mut PgConnection` are meant to run inside a transaction owned by
//! a service.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p techmart-cli -- migrate
//! ```

pub mod addresses;
pub mod brands;
pub mod carts;
pub mod categories;
pub mod coupons;
pub mod dashboard;
pub mod newsletter;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod returns;
pub mod reviews;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use brands::BrandRepository;
pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use coupons::CouponRepository;
pub use dashboard::DashboardRepository;
pub use newsletter::NewsletterRepository;
pub use notifications::NotificationRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use returns::ReturnRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email) or a lost update race.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to [`RepositoryError::Conflict`] with `message`.
    pub(crate) fn unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }

    /// Map foreign key violations to [`RepositoryError::Conflict`] with `message`.
    pub(crate) fn in_use(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" iphone "), "%iphone%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_repository_error_passthrough() {
        let err = RepositoryError::unique(sqlx::Error::RowNotFound, "duplicate");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
