use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::state::AppState;
use super::{run_blocking, ApiError};
use crate::catalog::{Catalog, QueryParams, ResultPage};
use crate::error::StorefrontError;
use crate::products::{CatalogProduct, ProductCount, ProductSearch, Products};

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i64,
}

/// GET /api/products
/// Filtered, sorted, paginated storefront products. Storage failures yield an
/// empty page rather than an error status.
pub async fn list_products(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ResultPage<CatalogProduct>>, ApiError> {
    let params = QueryParams::from_query_string(query.as_deref().unwrap_or_default());
    let page = run_blocking(move || Ok(Catalog::get_products(&state.db, &params))).await?;
    Ok(Json(page))
}

/// GET /api/products/featured
pub async fn get_featured_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogProduct>>, ApiError> {
    let products = run_blocking(move || Products::get_featured_products(&state.db)).await?;
    Ok(Json(products))
}

/// GET /api/products/count?category_id=
pub async fn get_product_count(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ProductCount>, ApiError> {
    let params = QueryParams::from_query_string(query.as_deref().unwrap_or_default());
    let count = run_blocking(move || {
        let category_id = params.first("category_id").ok_or_else(|| {
            StorefrontError::InvalidInput("category_id is required".to_string())
        })?;
        Ok(Products::get_product_count(&state.db, category_id))
    })
    .await?;
    Ok(Json(count))
}

/// GET /api/products/search?query=
/// Name search grouped by category. An empty query yields null data.
pub async fn search_products(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ProductSearch>, ApiError> {
    let params = QueryParams::from_query_string(query.as_deref().unwrap_or_default());
    let search = run_blocking(move || {
        let query = params.first("query").unwrap_or_default();
        Ok(Products::search_products(&state.db, query))
    })
    .await?;
    Ok(Json(search))
}

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<CatalogProduct>, ApiError> {
    let product = run_blocking(move || {
        Products::get_product(&state.db, &product_id)?
            .ok_or_else(|| StorefrontError::NotFound("Product not found.".to_string()))
    })
    .await?;
    Ok(Json(product))
}

/// PATCH /api/products/{id}/rating
pub async fn update_product_rating(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(req): Json<RatingRequest>,
) -> Result<StatusCode, ApiError> {
    run_blocking(move || Products::update_product_rating(&state.db, &product_id, req.rating))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
