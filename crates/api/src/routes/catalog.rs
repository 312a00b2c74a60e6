//! Public catalog: categories, brands and products.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use techmart_core::{BrandId, CategoryId, ProductId};

use crate::db::products::ProductFilter;
use crate::db::{BrandRepository, CategoryRepository, ProductRepository};
use crate::error::AppError;
use crate::models::{Brand, BrandDetail, Category, ProductDetail, ProductSummary};
use crate::response::{ApiResponse, ApiResult, PageParams, Paginated};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/categories/{id}", get(show_category))
        .route("/api/brands", get(list_brands))
        .route("/api/brands/{id}", get(show_brand))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(show_product))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BrandQuery {
    pub category_id: Option<CategoryId>,
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Arc<Vec<Category>>> {
    let categories = state.catalog().categories(state.pool()).await?;
    Ok(ApiResponse::ok(categories))
}

#[instrument(skip(state))]
async fn show_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> ApiResult<Category> {
    let category = CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| AppError::NotFound("category not found".to_owned()))?;
    Ok(ApiResponse::ok(category))
}

async fn list_brands(
    State(state): State<AppState>,
    Query(query): Query<BrandQuery>,
) -> ApiResult<Arc<Vec<Brand>>> {
    let brands = state
        .catalog()
        .brands(state.pool(), query.category_id)
        .await?;
    Ok(ApiResponse::ok(brands))
}

#[instrument(skip(state))]
async fn show_brand(State(state): State<AppState>, Path(id): Path<BrandId>) -> ApiResult<BrandDetail> {
    let brand = BrandRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("brand not found".to_owned()))?;
    Ok(ApiResponse::ok(brand))
}

/// Product listing with filters, sort and pagination.
#[instrument(skip(state))]
async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<Paginated<ProductSummary>> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
        && min > max
    {
        return Err(AppError::Validation(
            "min_price must not exceed max_price".to_owned(),
        ));
    }
    let (items, total) = ProductRepository::new(state.pool())
        .list(&filter, page)
        .await?;
    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

#[instrument(skip(state))]
async fn show_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<ProductDetail> {
    let product = ProductRepository::new(state.pool())
        .get_detail(id, false)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;
    Ok(ApiResponse::ok(product))
}
