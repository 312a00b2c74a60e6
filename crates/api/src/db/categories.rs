//! Category repository.

use sqlx::PgPool;

use techmart_core::{CategoryId, SpecTemplate};

use super::RepositoryError;
use crate::models::Category;

macro_rules! category_columns {
    () => {
        "id, name, slug, description, spec_template, is_active, created_at, updated_at"
    };
}

/// Writable category fields.
#[derive(Debug)]
pub struct CategoryInput<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub spec_template: &'a SpecTemplate,
    pub is_active: bool,
}

pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List categories by name; `active_only` hides disabled ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(concat!(
            "SELECT ",
            category_columns!(),
            " FROM categories WHERE (NOT $1 OR is_active) ORDER BY name"
        ))
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(concat!(
            "SELECT ",
            category_columns!(),
            " FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(category)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &CategoryInput<'_>) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(concat!(
            "INSERT INTO categories (name, slug, description, spec_template, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING ",
            category_columns!()
        ))
        .bind(input.name)
        .bind(input.slug)
        .bind(input.description)
        .bind(input.spec_template)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "category slug already exists"))
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput<'_>,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(concat!(
            "UPDATE categories SET name = $2, slug = $3, description = $4, spec_template = $5, \
             is_active = $6, updated_at = NOW() WHERE id = $1 RETURNING ",
            category_columns!()
        ))
        .bind(id)
        .bind(input.name)
        .bind(input.slug)
        .bind(input.description)
        .bind(input.spec_template)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "category slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` while products still reference it.
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::in_use(e, "category still has products"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
