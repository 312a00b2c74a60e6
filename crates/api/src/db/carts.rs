//! Cart repository.

use sqlx::{PgConnection, PgPool};

use techmart_core::{CartItemId, ProductId, UserId, VariantId};

use super::RepositoryError;
use crate::models::CartLineRow;

macro_rules! line_select {
    () => {
        "SELECT ci.id, ci.product_id, ci.variant_id, ci.quantity, p.name AS product_name, \
         p.slug, p.thumbnail_url, p.price AS base_price, v.price AS variant_price, \
         v.attributes, COALESCE(v.stock, p.stock) AS available_stock, p.is_active \
         FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id \
         LEFT JOIN product_variants v ON v.id = ci.variant_id"
    };
}

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All lines of a user's cart, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLineRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(concat!(
            line_select!(),
            " WHERE ci.user_id = $1 ORDER BY ci.created_at, ci.id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One line of a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn line(
        &self,
        user_id: UserId,
        id: CartItemId,
    ) -> Result<Option<CartLineRow>, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(concat!(
            line_select!(),
            " WHERE ci.user_id = $1 AND ci.id = $2"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Quantity already in the cart for a product/variant pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<i32, RepositoryError> {
        let quantity: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM cart_items \
             WHERE user_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(variant_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(quantity.unwrap_or(0))
    }

    /// Add `quantity` to the matching line, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
    ) -> Result<CartItemId, RepositoryError> {
        let id = sqlx::query_scalar(
            "INSERT INTO cart_items (user_id, product_id, variant_id, quantity) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, product_id, variant_id) \
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW() \
             RETURNING id",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3, updated_at = NOW() \
             WHERE id = $2 AND user_id = $1",
        )
        .bind(user_id)
        .bind(id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn remove(&self, user_id: UserId, id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $2 AND user_id = $1")
            .bind(user_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Empty a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// Remove the lines that were just ordered.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a delete fails.
pub async fn remove_purchased(
    conn: &mut PgConnection,
    user_id: UserId,
    lines: &[(ProductId, Option<VariantId>)],
) -> Result<(), RepositoryError> {
    for (product_id, variant_id) in lines {
        sqlx::query(
            "DELETE FROM cart_items \
             WHERE user_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(variant_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
