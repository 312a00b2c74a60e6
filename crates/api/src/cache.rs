//! In-process cache for catalog lookups.
//!
//! Category and brand lists change rarely and are read on every storefront
//! page, so they are cached with `moka` (5-minute TTL). Admin writes call
//! [`CatalogCache::invalidate`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use techmart_core::CategoryId;

use crate::db::{BrandRepository, CategoryRepository, RepositoryError};
use crate::models::{Brand, Category};

const TTL: Duration = Duration::from_secs(300);
const MAX_ENTRIES: u64 = 256;

/// Cached catalog lists.
#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Brands(Arc<Vec<Brand>>),
}

/// Shared catalog cache, cheap to clone.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<String, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(TTL)
                .build(),
        }
    }

    /// Active categories, from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if loading from the database fails.
    pub async fn categories(&self, pool: &PgPool) -> Result<Arc<Vec<Category>>, RepositoryError> {
        let key = categories_key();
        if let Some(CacheValue::Categories(categories)) = self.cache.get(&key).await {
            debug!("Category list served from cache");
            return Ok(categories);
        }

        let categories = Arc::new(CategoryRepository::new(pool).list(true).await?);
        self.cache
            .insert(key, CacheValue::Categories(Arc::clone(&categories)))
            .await;
        Ok(categories)
    }

    /// Brands, optionally limited to one category, from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if loading from the database fails.
    pub async fn brands(
        &self,
        pool: &PgPool,
        category: Option<CategoryId>,
    ) -> Result<Arc<Vec<Brand>>, RepositoryError> {
        let key = brands_key(category);
        if let Some(CacheValue::Brands(brands)) = self.cache.get(&key).await {
            debug!(?category, "Brand list served from cache");
            return Ok(brands);
        }

        let brands = Arc::new(BrandRepository::new(pool).list(category).await?);
        self.cache
            .insert(key, CacheValue::Brands(Arc::clone(&brands)))
            .await;
        Ok(brands)
    }

    /// Drop every cached list after a catalog write.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

fn categories_key() -> String {
    "categories".to_owned()
}

fn brands_key(category: Option<CategoryId>) -> String {
    category.map_or_else(|| "brands:all".to_owned(), |id| format!("brands:{id}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys_are_distinct_per_category() {
        assert_eq!(brands_key(None), "brands:all");
        assert_eq!(brands_key(Some(CategoryId::new(4))), "brands:4");
        assert_ne!(categories_key(), brands_key(None));
    }

    #[tokio::test]
    async fn test_invalidate_clears_entries() {
        let cache = CatalogCache::new();
        cache
            .cache
            .insert(categories_key(), CacheValue::Categories(Arc::new(Vec::new())))
            .await;
        assert!(cache.cache.get(&categories_key()).await.is_some());

        cache.invalidate().await;
        assert!(cache.cache.get(&categories_key()).await.is_none());
    }
}
