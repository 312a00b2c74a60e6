//! Catalog management: categories, brands, products, variants and images.
//!
//! Category and brand writes drop the cached public lists. Product specs are
//! checked against the category's spec template before they are stored.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use techmart_core::{
    BrandId, CategoryId, ProductId, ProductImageId, ProductSpecs, SpecTemplate, VariantId,
};

use crate::db::brands::BrandInput;
use crate::db::categories::CategoryInput;
use crate::db::products::{ImageInput, ProductFilter, ProductInput, VariantInput};
use crate::db::{BrandRepository, CategoryRepository, ProductRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{
    BrandDetail, Category, Product, ProductDetail, ProductImage, ProductSummary, Variant,
};
use crate::response::{ApiResponse, ApiResult, Message, PageParams, Paginated};
use crate::routes::{optional_text, required};
use crate::state::AppState;

const MAX_SLUG_LENGTH: usize = 120;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/categories", post(create_category))
        .route(
            "/api/admin/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route("/api/admin/brands", post(create_brand))
        .route(
            "/api/admin/brands/{id}",
            put(update_brand).delete(delete_brand),
        )
        .route("/api/admin/products", get(list_products).post(create_product))
        .route(
            "/api/admin/products/{id}",
            put(update_product).delete(delete_product),
        )
        .route("/api/admin/products/{id}/variants", post(add_variant))
        .route(
            "/api/admin/variants/{id}",
            put(update_variant).delete(delete_variant),
        )
        .route("/api/admin/products/{id}/images", post(add_image))
        .route("/api/admin/images/{id}", delete(delete_image))
}

/// Slugs are lowercase ASCII words joined by single hyphens.
fn check_slug(slug: &str) -> Result<&str, AppError> {
    let slug = required("slug", slug)?;
    let valid = slug.len() <= MAX_SLUG_LENGTH
        && slug
            .split('-')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    if valid {
        Ok(slug)
    } else {
        Err(AppError::Validation(
            "slug may only contain lowercase letters, digits and single hyphens".to_owned(),
        ))
    }
}

fn check_non_negative(field: &str, value: Decimal) -> Result<(), AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::Validation(format!("{field} must not be negative")));
    }
    Ok(())
}

fn check_stock(stock: i32) -> Result<(), AppError> {
    if stock < 0 {
        return Err(AppError::Validation("stock must not be negative".to_owned()));
    }
    Ok(())
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub spec_template: SpecTemplate,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

impl CategoryRequest {
    fn input(&self) -> Result<CategoryInput<'_>, AppError> {
        Ok(CategoryInput {
            name: required("name", &self.name)?,
            slug: check_slug(&self.slug)?,
            description: optional_text(self.description.as_deref()),
            spec_template: &self.spec_template,
            is_active: self.is_active,
        })
    }
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, slug = %body.slug))]
async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CategoryRequest>,
) -> ApiResult<Category> {
    let category = CategoryRepository::new(state.pool())
        .create(&body.input()?)
        .await?;
    state.catalog().invalidate().await;
    tracing::info!(category_id = %category.id, "Category created");
    Ok(ApiResponse::created(category))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(body): Json<CategoryRequest>,
) -> ApiResult<Category> {
    let category = CategoryRepository::new(state.pool())
        .update(id, &body.input()?)
        .await?;
    state.catalog().invalidate().await;
    Ok(ApiResponse::ok(category))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> ApiResult<Message> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    state.catalog().invalidate().await;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(ApiResponse::ok(Message::new("Category deleted")))
}

// =============================================================================
// Brands
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct BrandRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

impl BrandRequest {
    fn input(&self) -> Result<BrandInput<'_>, AppError> {
        Ok(BrandInput {
            name: required("name", &self.name)?,
            slug: check_slug(&self.slug)?,
            logo_url: optional_text(self.logo_url.as_deref()),
            description: optional_text(self.description.as_deref()),
            category_ids: &self.category_ids,
        })
    }
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, slug = %body.slug))]
async fn create_brand(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<BrandRequest>,
) -> ApiResult<BrandDetail> {
    let brand = BrandRepository::new(state.pool())
        .create(&body.input()?)
        .await?;
    state.catalog().invalidate().await;
    tracing::info!(brand_id = %brand.brand.id, "Brand created");
    Ok(ApiResponse::created(brand))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update_brand(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BrandId>,
    Json(body): Json<BrandRequest>,
) -> ApiResult<BrandDetail> {
    let brand = BrandRepository::new(state.pool())
        .update(id, &body.input()?)
        .await?;
    state.catalog().invalidate().await;
    Ok(ApiResponse::ok(brand))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_brand(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BrandId>,
) -> ApiResult<Message> {
    BrandRepository::new(state.pool()).delete(id).await?;
    state.catalog().invalidate().await;
    Ok(ApiResponse::ok(Message::new("Brand deleted")))
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub category_id: CategoryId,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub specs: ProductSpecs,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Only read on create.
    #[serde(default)]
    pub variants: Vec<VariantInput>,
    /// Only read on create.
    #[serde(default)]
    pub images: Vec<ImageInput>,
}

impl ProductRequest {
    /// Validate fields and check specs against the category template.
    async fn input(&self, state: &AppState) -> Result<ProductInput<'_>, AppError> {
        let name = required("name", &self.name)?;
        let slug = check_slug(&self.slug)?;
        check_non_negative("price", self.price)?;
        check_stock(self.stock)?;

        let category = CategoryRepository::new(state.pool())
            .get(self.category_id)
            .await?
            .ok_or_else(|| AppError::Validation("category does not exist".to_owned()))?;
        self.specs.validate_against(&category.spec_template)?;

        Ok(ProductInput {
            category_id: self.category_id,
            brand_id: self.brand_id,
            name,
            slug,
            description: optional_text(self.description.as_deref()),
            price: self.price,
            stock: self.stock,
            specs: &self.specs,
            thumbnail_url: optional_text(self.thumbnail_url.as_deref()),
            is_active: self.is_active,
        })
    }
}

fn check_variant(variant: &VariantInput) -> Result<(), AppError> {
    required("sku", &variant.sku)?;
    if variant.attributes.is_empty() {
        return Err(AppError::Validation(
            "a variant needs at least one attribute".to_owned(),
        ));
    }
    if let Some(price) = variant.price {
        check_non_negative("variant price", price)?;
    }
    check_stock(variant.stock)
}

fn check_image(image: &ImageInput) -> Result<(), AppError> {
    required("url", &image.url).map(|_| ())
}

/// All products, including inactive ones.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(mut filter): Query<ProductFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<ProductSummary>> {
    filter.include_inactive = true;
    let (items, total) = ProductRepository::new(state.pool())
        .list(&filter, page)
        .await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

/// Create a product with its variants and images in one transaction.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, slug = %body.slug))]
async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<ProductRequest>,
) -> ApiResult<ProductDetail> {
    let input = body.input(&state).await?;
    for variant in &body.variants {
        check_variant(variant)?;
    }
    for image in &body.images {
        check_image(image)?;
    }

    let products = ProductRepository::new(state.pool());
    let id = products.create(&input, &body.variants, &body.images).await?;
    let detail = products
        .get_detail(id, true)
        .await?
        .ok_or_else(|| AppError::Internal(format!("product {id} vanished after insert")))?;
    tracing::info!(product_id = %id, variants = body.variants.len(), "Product created");
    Ok(ApiResponse::created(detail))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductRequest>,
) -> ApiResult<Product> {
    let input = body.input(&state).await?;
    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await?;
    Ok(ApiResponse::ok(product))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> ApiResult<Message> {
    ProductRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(ApiResponse::ok(Message::new("Product deleted")))
}

// =============================================================================
// Variants and images
// =============================================================================

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, sku = %body.sku))]
async fn add_variant(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(product_id): Path<ProductId>,
    Json(body): Json<VariantInput>,
) -> ApiResult<Variant> {
    check_variant(&body)?;
    let variant = ProductRepository::new(state.pool())
        .add_variant(product_id, &body)
        .await?;
    Ok(ApiResponse::created(variant))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn update_variant(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<VariantId>,
    Json(body): Json<VariantInput>,
) -> ApiResult<Variant> {
    check_variant(&body)?;
    let variant = ProductRepository::new(state.pool())
        .update_variant(id, &body)
        .await?;
    Ok(ApiResponse::ok(variant))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_variant(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<VariantId>,
) -> ApiResult<Message> {
    ProductRepository::new(state.pool()).delete_variant(id).await?;
    Ok(ApiResponse::ok(Message::new("Variant deleted")))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
async fn add_image(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(product_id): Path<ProductId>,
    Json(body): Json<ImageInput>,
) -> ApiResult<ProductImage> {
    check_image(&body)?;
    let image = ProductRepository::new(state.pool())
        .add_image(product_id, &body)
        .await?;
    Ok(ApiResponse::created(image))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_image(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductImageId>,
) -> ApiResult<Message> {
    ProductRepository::new(state.pool()).delete_image(id).await?;
    Ok(ApiResponse::ok(Message::new("Image deleted")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use techmart_core::VariantAttributes;

    use super::*;

    #[test]
    fn test_check_slug() {
        assert_eq!(check_slug(" iphone-15-pro ").unwrap(), "iphone-15-pro");
        assert!(check_slug("iPhone").is_err());
        assert!(check_slug("double--hyphen").is_err());
        assert!(check_slug("-leading").is_err());
        assert!(check_slug("with space").is_err());
        assert!(check_slug("").is_err());
    }

    #[test]
    fn test_check_variant() {
        let attributes =
            VariantAttributes::new(BTreeMap::from([("color".to_owned(), "Blue".to_owned())]))
                .unwrap();
        let mut variant = VariantInput {
            sku: "IP15-BLU-128".to_owned(),
            attributes,
            price: Some(Decimal::new(21_990_000, 0)),
            stock: 4,
        };
        assert!(check_variant(&variant).is_ok());

        variant.stock = -1;
        assert!(check_variant(&variant).is_err());

        variant.stock = 0;
        variant.price = Some(Decimal::new(-1, 0));
        assert!(check_variant(&variant).is_err());

        variant.price = None;
        variant.attributes = VariantAttributes::default();
        assert!(check_variant(&variant).is_err());
    }
}
