//! Wishlist repository.

use sqlx::PgPool;

use techmart_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::WishlistEntry;

pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Wishlisted products, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, WishlistEntry>(
            "SELECT p.id AS product_id, p.name, p.slug, p.price, p.stock, p.thumbnail_url, \
             w.created_at AS added_at \
             FROM wishlist_items w JOIN products p ON p.id = w.product_id \
             WHERE w.user_id = $1 ORDER BY w.created_at DESC, w.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(entries)
    }

    /// Add a product; adding it twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await
        .map_err(|e| match RepositoryError::in_use(e, "") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            other => other,
        })?;
        Ok(())
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it was not wishlisted.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
