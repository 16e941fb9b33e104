use axum::{
    extract::{Path, State},
    Json,
};

use super::state::AppState;
use super::{run_blocking, ApiError};
use crate::categories::{Categories, Category, Subcategory};

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = run_blocking(move || Categories::get_categories(&state.db)).await?;
    Ok(Json(categories))
}

/// GET /api/subcategories
pub async fn list_subcategories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Subcategory>>, ApiError> {
    let subcategories = run_blocking(move || Categories::get_subcategories(&state.db)).await?;
    Ok(Json(subcategories))
}

/// GET /api/categories/{id}/subcategories
pub async fn list_subcategories_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<Json<Vec<Subcategory>>, ApiError> {
    let subcategories = run_blocking(move || {
        Categories::get_subcategories_by_category(&state.db, &category_id)
    })
    .await?;
    Ok(Json(subcategories))
}
