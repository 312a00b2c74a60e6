//! Brand repository, including the brand/category link table.

use sqlx::{PgConnection, PgPool};

use techmart_core::{BrandId, CategoryId};

use super::RepositoryError;
use crate::models::{Brand, BrandDetail};

macro_rules! brand_columns {
    () => {
        "b.id, b.name, b.slug, b.logo_url, b.description, b.created_at, b.updated_at"
    };
}

/// Writable brand fields.
#[derive(Debug)]
pub struct BrandInput<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub logo_url: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category_ids: &'a [CategoryId],
}

pub struct BrandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BrandRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List brands by name, optionally only those selling in a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, category: Option<CategoryId>) -> Result<Vec<Brand>, RepositoryError> {
        let brands = sqlx::query_as::<_, Brand>(concat!(
            "SELECT ",
            brand_columns!(),
            " FROM brands b WHERE $1::int IS NULL OR EXISTS ( \
               SELECT 1 FROM brand_categories bc \
               WHERE bc.brand_id = b.id AND bc.category_id = $1) \
             ORDER BY b.name"
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;
        Ok(brands)
    }

    /// Get a brand with its category IDs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BrandId) -> Result<Option<BrandDetail>, RepositoryError> {
        let Some(brand) = sqlx::query_as::<_, Brand>(concat!(
            "SELECT ",
            brand_columns!(),
            " FROM brands b WHERE b.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let category_ids = sqlx::query_scalar::<_, CategoryId>(
            "SELECT category_id FROM brand_categories WHERE brand_id = $1 ORDER BY category_id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(BrandDetail {
            brand,
            category_ids,
        }))
    }

    /// Create a brand and its category links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or a category
    /// does not exist.
    pub async fn create(&self, input: &BrandInput<'_>) -> Result<BrandDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let brand = sqlx::query_as::<_, Brand>(concat!(
            "INSERT INTO brands AS b (name, slug, logo_url, description) \
             VALUES ($1, $2, $3, $4) RETURNING ",
            brand_columns!()
        ))
        .bind(input.name)
        .bind(input.slug)
        .bind(input.logo_url)
        .bind(input.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique(e, "brand slug already exists"))?;

        sync_categories(&mut tx, brand.id, input.category_ids).await?;
        tx.commit().await?;

        Ok(BrandDetail {
            brand,
            category_ids: input.category_ids.to_vec(),
        })
    }

    /// Update a brand and replace its category links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: BrandId,
        input: &BrandInput<'_>,
    ) -> Result<BrandDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let brand = sqlx::query_as::<_, Brand>(concat!(
            "UPDATE brands AS b SET name = $2, slug = $3, logo_url = $4, description = $5, \
             updated_at = NOW() WHERE b.id = $1 RETURNING ",
            brand_columns!()
        ))
        .bind(id)
        .bind(input.name)
        .bind(input.slug)
        .bind(input.logo_url)
        .bind(input.description)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique(e, "brand slug already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        sync_categories(&mut tx, id, input.category_ids).await?;
        tx.commit().await?;

        Ok(BrandDetail {
            brand,
            category_ids: input.category_ids.to_vec(),
        })
    }

    /// Delete a brand; its products keep existing without a brand.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist.
    pub async fn delete(&self, id: BrandId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Replace the category links of a brand.
async fn sync_categories(
    conn: &mut PgConnection,
    brand_id: BrandId,
    category_ids: &[CategoryId],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM brand_categories WHERE brand_id = $1")
        .bind(brand_id)
        .execute(&mut *conn)
        .await?;

    if category_ids.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = category_ids.iter().map(CategoryId::as_i32).collect();
    sqlx::query(
        "INSERT INTO brand_categories (brand_id, category_id) \
         SELECT $1, UNNEST($2::int[]) ON CONFLICT DO NOTHING",
    )
    .bind(brand_id)
    .bind(&ids)
    .execute(&mut *conn)
    .await
    .map_err(|e| RepositoryError::in_use(e, "unknown category"))?;

    Ok(())
}
