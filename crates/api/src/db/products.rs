//! Product repository: listings, detail, variants and images.
//!
//! A product's `stock` column is the aggregate stock. When a product has
//! variants it is recomputed from them by [`resync_stock`] after every
//! variant write, inside the same transaction.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use techmart_core::{
    BrandId, CategoryId, ProductId, ProductImageId, ProductSpecs, VariantAttributes, VariantId,
};

use super::{RepositoryError, like_pattern};
use crate::models::{
    Product, ProductDetail, ProductImage, ProductSummary, RatingSummary, Variant, VariantView,
};
use crate::response::PageParams;

macro_rules! product_columns {
    () => {
        "id, category_id, brand_id, name, slug, description, price, stock, specs, \
         thumbnail_url, is_active, sold_count, created_at, updated_at"
    };
}

macro_rules! variant_columns {
    () => {
        "id, product_id, sku, attributes, price, stock, created_at, updated_at"
    };
}

const SUMMARY_SELECT: &str = "SELECT p.id, p.name, p.slug, p.price, p.stock, p.thumbnail_url, \
     p.sold_count, p.is_active, p.category_id, c.name AS category_name, p.brand_id, \
     b.name AS brand_name, r.rating_average, r.rating_count, p.created_at \
     FROM products p \
     JOIN categories c ON c.id = p.category_id \
     LEFT JOIN brands b ON b.id = p.brand_id \
     LEFT JOIN LATERAL ( \
       SELECT ROUND(AVG(rv.rating), 1) AS rating_average, COUNT(*) AS rating_count \
       FROM reviews rv WHERE rv.product_id = p.id AND rv.is_visible \
     ) r ON TRUE";

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    BestSelling,
    Name,
}

impl ProductSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id",
            Self::PriceDesc => "p.price DESC, p.id",
            Self::BestSelling => "p.sold_count DESC, p.id",
            Self::Name => "p.name ASC, p.id",
        }
    }
}

/// Listing filters, deserialised from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: bool,
    pub sort: ProductSort,
    /// Admin listings also show disabled products.
    #[serde(skip)]
    pub include_inactive: bool,
}

impl ProductFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if !self.include_inactive {
            qb.push(" AND p.is_active");
        }
        if let Some(category_id) = self.category_id {
            qb.push(" AND p.category_id = ").push_bind(category_id);
        }
        if let Some(brand_id) = self.brand_id {
            qb.push(" AND p.brand_id = ").push_bind(brand_id);
        }
        if let Some(q) = self.q.as_deref().filter(|q| !q.trim().is_empty()) {
            qb.push(" AND p.name ILIKE ").push_bind(like_pattern(q));
        }
        if let Some(min) = self.min_price {
            qb.push(" AND p.price >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            qb.push(" AND p.price <= ").push_bind(max);
        }
        if self.in_stock {
            qb.push(" AND p.stock > 0");
        }
    }
}

/// Writable product fields.
#[derive(Debug)]
pub struct ProductInput<'a> {
    pub category_id: CategoryId,
    pub brand_id: Option<BrandId>,
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
    /// Ignored while the product has variants.
    pub stock: i32,
    pub specs: &'a ProductSpecs,
    pub thumbnail_url: Option<&'a str>,
    pub is_active: bool,
}

/// Writable variant fields.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    pub sku: String,
    pub attributes: VariantAttributes,
    pub price: Option<Decimal>,
    pub stock: i32,
}

/// A product image reference.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageInput {
    pub url: String,
    #[serde(default)]
    pub sort_order: i32,
}

/// Display names joined onto a product.
#[derive(sqlx::FromRow)]
struct ProductNames {
    category_name: String,
    brand_name: Option<String>,
}

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, one page at a time.
    ///
    /// Returns the page and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageParams,
    ) -> Result<(Vec<ProductSummary>, i64), RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY ").push(filter.sort.order_by());
        qb.push(" LIMIT ").push_bind(page.limit());
        qb.push(" OFFSET ").push_bind(page.offset());
        let items = qb
            .build_query_as::<ProductSummary>()
            .fetch_all(self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((items, total))
    }

    /// Get a bare product row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Get a product with variants, images, names and rating.
    ///
    /// Disabled products are hidden unless `include_inactive` is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(
        &self,
        id: ProductId,
        include_inactive: bool,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = self.get(id).await? else {
            return Ok(None);
        };
        if !product.is_active && !include_inactive {
            return Ok(None);
        }

        let names = sqlx::query_as::<_, ProductNames>(
            "SELECT c.name AS category_name, b.name AS brand_name \
             FROM categories c LEFT JOIN brands b ON b.id = $2 WHERE c.id = $1",
        )
        .bind(product.category_id)
        .bind(product.brand_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| RepositoryError::DataCorruption(format!("product {id} has no category")))?;

        let variants = self.variants(id).await?;
        let images = self.images(id).await?;

        let rating = sqlx::query_as::<_, RatingSummary>(
            "SELECT ROUND(AVG(rating), 1) AS average, COUNT(*) AS count \
             FROM reviews WHERE product_id = $1 AND is_visible",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        let base = product.price;
        Ok(Some(ProductDetail {
            product,
            category_name: names.category_name,
            brand_name: names.brand_name,
            variants: variants
                .into_iter()
                .map(|v| VariantView::new(v, base))
                .collect(),
            images,
            rating,
        }))
    }

    /// Variants of a product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants(&self, product_id: ProductId) -> Result<Vec<Variant>, RepositoryError> {
        let variants = sqlx::query_as::<_, Variant>(concat!(
            "SELECT ",
            variant_columns!(),
            " FROM product_variants WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(variants)
    }

    /// Get a single variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_variant(&self, id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        let variant = sqlx::query_as::<_, Variant>(concat!(
            "SELECT ",
            variant_columns!(),
            " FROM product_variants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(variant)
    }

    /// Does the product have any variants?
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_variants(&self, product_id: ProductId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM product_variants WHERE product_id = $1)",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    async fn images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        let images = sqlx::query_as::<_, ProductImage>(
            "SELECT id, product_id, url, sort_order FROM product_images \
             WHERE product_id = $1 ORDER BY sort_order, id",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(images)
    }

    // =========================================================================
    // Admin writes
    // =========================================================================

    /// Create a product with its variants and images in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug or a SKU is taken, or
    /// the category or brand does not exist.
    pub async fn create(
        &self,
        input: &ProductInput<'_>,
        variants: &[VariantInput],
        images: &[ImageInput],
    ) -> Result<ProductId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: ProductId = sqlx::query_scalar(
            "INSERT INTO products (category_id, brand_id, name, slug, description, price, \
             stock, specs, thumbnail_url, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(input.category_id)
        .bind(input.brand_id)
        .bind(input.name)
        .bind(input.slug)
        .bind(input.description)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.specs)
        .bind(input.thumbnail_url)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_product_error(e, "product slug already exists"))?;

        for variant in variants {
            insert_variant(&mut tx, id, variant).await?;
        }
        for image in images {
            insert_image(&mut tx, id, image).await?;
        }
        if !variants.is_empty() {
            resync_stock(&mut tx, id).await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Update a product's own fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` on a duplicate slug or unknown
    /// category/brand.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput<'_>,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(concat!(
            "UPDATE products SET category_id = $2, brand_id = $3, name = $4, slug = $5, \
             description = $6, price = $7, \
             stock = CASE WHEN EXISTS (SELECT 1 FROM product_variants v WHERE v.product_id = $1) \
                     THEN stock ELSE $8 END, \
             specs = $9, thumbnail_url = $10, is_active = $11, updated_at = NOW() \
             WHERE id = $1 RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(input.category_id)
        .bind(input.brand_id)
        .bind(input.name)
        .bind(input.slug)
        .bind(input.description)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.specs)
        .bind(input.thumbnail_url)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_product_error(e, "product slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Order history keeps its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add a variant and resync the parent stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the SKU is taken.
    pub async fn add_variant(
        &self,
        product_id: ProductId,
        input: &VariantInput,
    ) -> Result<Variant, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, product_id).await?;
        let variant = insert_variant(&mut tx, product_id, input).await?;
        resync_stock(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(variant)
    }

    /// Replace a variant's fields and resync the parent stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    /// Returns `RepositoryError::Conflict` if the SKU is taken.
    pub async fn update_variant(
        &self,
        id: VariantId,
        input: &VariantInput,
    ) -> Result<Variant, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let variant = sqlx::query_as::<_, Variant>(concat!(
            "UPDATE product_variants SET sku = $2, attributes = $3, price = $4, stock = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING ",
            variant_columns!()
        ))
        .bind(id)
        .bind(&input.sku)
        .bind(&input.attributes)
        .bind(input.price)
        .bind(input.stock)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique(e, "sku already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        resync_stock(&mut tx, variant.product_id).await?;
        tx.commit().await?;
        Ok(variant)
    }

    /// Delete a variant and resync the parent stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist and
    /// `RepositoryError::Conflict` while unshipped orders still reference it.
    pub async fn delete_variant(&self, id: VariantId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let in_open_orders: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
               SELECT 1 FROM order_items oi JOIN orders o ON o.id = oi.order_id \
               WHERE oi.variant_id = $1 AND o.status IN ('pending', 'processing') \
             )",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if in_open_orders {
            return Err(RepositoryError::Conflict(
                "variant is part of orders that have not shipped yet".to_owned(),
            ));
        }

        let product_id: ProductId =
            sqlx::query_scalar("DELETE FROM product_variants WHERE id = $1 RETURNING product_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        resync_stock(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Attach an image URL to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        input: &ImageInput,
    ) -> Result<ProductImage, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, product_id).await?;
        let image = insert_image(&mut tx, product_id, input).await?;
        tx.commit().await?;
        Ok(image)
    }

    /// Remove an image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image does not exist.
    pub async fn delete_image(&self, id: ProductImageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product_images WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn map_product_error(e: sqlx::Error, duplicate: &str) -> RepositoryError {
    match RepositoryError::unique(e, duplicate) {
        RepositoryError::Database(e) => RepositoryError::in_use(e, "unknown category or brand"),
        other => other,
    }
}

async fn lock_product(conn: &mut PgConnection, id: ProductId) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, ProductId>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(())
}

async fn insert_variant(
    conn: &mut PgConnection,
    product_id: ProductId,
    input: &VariantInput,
) -> Result<Variant, RepositoryError> {
    sqlx::query_as::<_, Variant>(concat!(
        "INSERT INTO product_variants (product_id, sku, attributes, price, stock) \
         VALUES ($1, $2, $3, $4, $5) RETURNING ",
        variant_columns!()
    ))
    .bind(product_id)
    .bind(&input.sku)
    .bind(&input.attributes)
    .bind(input.price)
    .bind(input.stock)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::unique(e, "sku already exists"))
}

async fn insert_image(
    conn: &mut PgConnection,
    product_id: ProductId,
    input: &ImageInput,
) -> Result<ProductImage, RepositoryError> {
    let image = sqlx::query_as::<_, ProductImage>(
        "INSERT INTO product_images (product_id, url, sort_order) VALUES ($1, $2, $3) \
         RETURNING id, product_id, url, sort_order",
    )
    .bind(product_id)
    .bind(&input.url)
    .bind(input.sort_order)
    .fetch_one(&mut *conn)
    .await?;
    Ok(image)
}

/// Recompute a product's aggregate stock as the sum of its variants.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn resync_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE products SET stock = ( \
           SELECT COALESCE(SUM(stock), 0) FROM product_variants WHERE product_id = $1 \
         ), updated_at = NOW() WHERE id = $1",
    )
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Current price and stock of a product, or of one of its variants.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockLine {
    pub product_id: ProductId,
    pub name: String,
    pub is_active: bool,
    pub has_variants: bool,
    pub base_price: Decimal,
    /// Set only when the requested variant belongs to the product.
    pub variant_id: Option<VariantId>,
    pub variant_price: Option<Decimal>,
    pub attributes: Option<VariantAttributes>,
    /// Variant stock when a variant matched, product stock otherwise.
    pub stock: i32,
}

/// Load the purchasable state of a product/variant pair.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn stock_line(
    conn: &mut PgConnection,
    product_id: ProductId,
    variant_id: Option<VariantId>,
) -> Result<Option<StockLine>, RepositoryError> {
    let line = sqlx::query_as::<_, StockLine>(
        "SELECT p.id AS product_id, p.name, p.is_active, \
         EXISTS (SELECT 1 FROM product_variants pv WHERE pv.product_id = p.id) AS has_variants, \
         p.price AS base_price, v.id AS variant_id, v.price AS variant_price, v.attributes, \
         COALESCE(v.stock, p.stock) AS stock \
         FROM products p \
         LEFT JOIN product_variants v ON v.id = $2 AND v.product_id = p.id \
         WHERE p.id = $1",
    )
    .bind(product_id)
    .bind(variant_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(line)
}

/// Take `quantity` units out of stock for a shipped line and count them as
/// sold.
///
/// The decrement is conditional on enough stock remaining. A line without a
/// variant only draws on products that have no variants, since their stock is
/// the sum of the variants.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if there is not enough stock or the
/// line's variant no longer exists.
pub async fn take_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = if let Some(variant_id) = variant_id {
        sqlx::query(
            "UPDATE product_variants SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND stock >= $2",
        )
        .bind(variant_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?
    } else {
        sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND stock >= $2 \
             AND NOT EXISTS (SELECT 1 FROM product_variants WHERE product_id = $1)",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?
    };

    if result.rows_affected() == 0 {
        let detail = if variant_id.is_some() {
            ""
        } else {
            ", or its variant was removed"
        };
        return Err(RepositoryError::Conflict(format!(
            "insufficient stock for product {product_id}{detail}"
        )));
    }
    if variant_id.is_some() {
        resync_stock(conn, product_id).await?;
    }

    sqlx::query("UPDATE products SET sold_count = sold_count + $2 WHERE id = $1")
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Put returned units back into stock.
///
/// Units of a variant that has since been deleted cannot be put back on a
/// product that still has variants; they are dropped and the aggregate is
/// resynced.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an update fails.
pub async fn restock(
    conn: &mut PgConnection,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: i32,
) -> Result<(), RepositoryError> {
    if let Some(variant_id) = variant_id {
        sqlx::query(
            "UPDATE product_variants SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(variant_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
        resync_stock(conn, product_id).await?;
    } else {
        let result = sqlx::query(
            "UPDATE products SET stock = stock + $2, updated_at = NOW() \
             WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM product_variants WHERE product_id = $1)",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            tracing::warn!(%product_id, quantity, "Returned units have no variant to go back to");
            resync_stock(conn, product_id).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parses_from_query_values() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap_or_default();
        assert_eq!(sort, ProductSort::PriceDesc);
        assert_eq!(ProductSort::default().order_by(), "p.created_at DESC, p.id DESC");
    }

    #[test]
    fn test_filter_builds_where_clause() {
        let filter = ProductFilter {
            category_id: Some(CategoryId::new(2)),
            q: Some("galaxy".to_owned()),
            in_stock: true,
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        filter.push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM products p WHERE TRUE AND p.is_active \
             AND p.category_id = $1 AND p.name ILIKE $2 AND p.stock > 0"
        );
    }

    #[test]
    fn test_admin_filter_includes_inactive() {
        let filter = ProductFilter {
            include_inactive: true,
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM products p");
        filter.push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT 1 FROM products p WHERE TRUE");
    }
}
