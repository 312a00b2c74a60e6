//! Review repository.

use sqlx::PgPool;

use techmart_core::{ProductId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::Review;
use crate::response::PageParams;

macro_rules! review_select {
    () => {
        "SELECT r.id, r.product_id, p.name AS product_name, r.user_id, u.name AS user_name, \
         r.rating, r.comment, r.is_visible, r.created_at \
         FROM reviews r JOIN products p ON p.id = r.product_id JOIN users u ON u.id = r.user_id"
    };
}

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Visible reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_product(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(concat!(
            review_select!(),
            " WHERE r.product_id = $1 AND r.is_visible ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Has the user received this product in a delivered or returned order?
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_purchased(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let purchased: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
               SELECT 1 FROM order_items oi JOIN orders o ON o.id = oi.order_id \
               WHERE o.user_id = $1 AND oi.product_id = $2 \
               AND o.status IN ('delivered', 'returned'))",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(purchased)
    }

    /// Create a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        let id: ReviewId = sqlx::query_scalar(
            "INSERT INTO reviews (product_id, user_id, rating, comment) VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "you have already reviewed this product"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(concat!(review_select!(), " WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(review)
    }

    /// Delete a review, optionally only if written by `author`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no matching review exists.
    pub async fn delete(&self, id: ReviewId, author: Option<UserId>) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM reviews WHERE id = $1 AND ($2::int IS NULL OR user_id = $2)")
                .bind(id)
                .bind(author)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// All reviews for moderation, newest first, and the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self, page: PageParams) -> Result<(Vec<Review>, i64), RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(concat!(
            review_select!(),
            " ORDER BY r.created_at DESC, r.id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(self.pool)
            .await?;

        Ok((reviews, total))
    }

    /// Show or hide a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn set_visible(&self, id: ReviewId, visible: bool) -> Result<Review, RepositoryError> {
        let result = sqlx::query("UPDATE reviews SET is_visible = $2 WHERE id = $1")
            .bind(id)
            .bind(visible)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}
