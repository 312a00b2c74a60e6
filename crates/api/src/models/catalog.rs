//! Catalog types: categories, brands, products, variants and images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use techmart_core::rules::pricing;
use techmart_core::{
    BrandId, CategoryId, ProductId, ProductImageId, ProductSpecs, SpecTemplate, VariantAttributes,
    VariantId,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub spec_template: SpecTemplate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A brand with the categories it sells in.
#[derive(Debug, Clone, Serialize)]
pub struct BrandDetail {
    #[serde(flatten)]
    pub brand: Brand,
    pub category_ids: Vec<CategoryId>,
}

/// A product row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub brand_id: Option<BrandId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Aggregate stock; equals the variant sum when variants exist.
    pub stock: i32,
    pub specs: ProductSpecs,
    pub thumbnail_url: Option<String>,
    pub is_active: bool,
    pub sold_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A listing row with display names and rating.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub stock: i32,
    pub thumbnail_url: Option<String>,
    pub sold_count: i32,
    pub is_active: bool,
    pub category_id: CategoryId,
    pub category_name: String,
    pub brand_id: Option<BrandId>,
    pub brand_name: Option<String>,
    pub rating_average: Option<Decimal>,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    pub attributes: VariantAttributes,
    /// Overrides the product price when set.
    pub price: Option<Decimal>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    #[must_use]
    pub fn label(&self) -> String {
        self.attributes.label()
    }

    /// Price charged for this variant of a product priced at `base`.
    #[must_use]
    pub fn unit_price(&self, base: Decimal) -> Decimal {
        pricing::unit_price(base, self.price)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub url: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct RatingSummary {
    pub average: Option<Decimal>,
    pub count: i64,
}

/// Everything the product page needs.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub brand_name: Option<String>,
    pub variants: Vec<VariantView>,
    pub images: Vec<ProductImage>,
    pub rating: RatingSummary,
}

/// A variant with its label and effective price resolved.
#[derive(Debug, Clone, Serialize)]
pub struct VariantView {
    #[serde(flatten)]
    pub variant: Variant,
    pub label: String,
    pub unit_price: Decimal,
}

impl VariantView {
    #[must_use]
    pub fn new(variant: Variant, base_price: Decimal) -> Self {
        Self {
            label: variant.label(),
            unit_price: variant.unit_price(base_price),
            variant,
        }
    }
}
