use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use log::info;
use serde::Serialize;

use super::state::AppState;
use super::{run_blocking, ApiError};
use crate::catalog::{Catalog, QueryParams, ResultPage};
use crate::error::StorefrontError;
use crate::products::{NewProduct, ProductTableRow, Products};
use crate::stores::{NewStore, Store, StoreListing, Stores};

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// GET /api/stores
pub async fn list_stores(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ResultPage<StoreListing>>, ApiError> {
    let params = QueryParams::from_query_string(query.as_deref().unwrap_or_default());
    let page = run_blocking(move || Ok(Catalog::get_stores(&state.db, &params))).await?;
    Ok(Json(page))
}

/// POST /api/stores
pub async fn create_store(
    State(state): State<AppState>,
    Json(req): Json<NewStore>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = run_blocking(move || Stores::add_store(&state.db, &req)).await?;
    info!("Created store via API (id: {})", id);
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// PUT /api/stores/{id}
pub async fn update_store(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Json(req): Json<NewStore>,
) -> Result<StatusCode, ApiError> {
    run_blocking(move || Stores::update_store(&state.db, &store_id, &req)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/stores/{id}
pub async fn get_store(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<Json<Store>, ApiError> {
    let store = run_blocking(move || {
        Stores::get_store(&state.db, &store_id)?
            .ok_or_else(|| StorefrontError::NotFound("Store not found.".to_string()))
    })
    .await?;
    Ok(Json(store))
}

/// GET /api/stores/{id}/products
/// The merchant dashboard's product table for one store.
pub async fn list_store_products(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<ResultPage<ProductTableRow>>, ApiError> {
    let params = QueryParams::from_query_string(query.as_deref().unwrap_or_default());
    let page = run_blocking(move || {
        Ok(Catalog::get_store_products(&state.db, &store_id, &params))
    })
    .await?;
    Ok(Json(page))
}

/// POST /api/stores/{id}/products
pub async fn create_product(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = run_blocking(move || Products::add_product(&state.db, &store_id, &req)).await?;
    info!("Created product via API (id: {})", id);
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// PUT /api/stores/{id}/products/{product_id}
pub async fn update_product(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(String, String)>,
    Json(req): Json<NewProduct>,
) -> Result<StatusCode, ApiError> {
    run_blocking(move || Products::update_product(&state.db, &store_id, &product_id, &req))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/stores/{id}/products/{product_id}
pub async fn delete_product(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    run_blocking(move || Products::delete_product(&state.db, &store_id, &product_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::Categories;
    use crate::database::Database;

    struct Setup {
        state: AppState,
        store_id: String,
        category_id: String,
    }

    fn setup() -> Setup {
        let db = Database::open_in_memory().unwrap();
        let store_id = Stores::add_store(
            &db,
            &NewStore {
                user_id: None,
                name: "Board Room".into(),
                description: None,
            },
        )
        .unwrap();
        let category_id = Categories::add_category(&db, "Skateboards", None).unwrap();
        Setup {
            state: AppState::new(db),
            store_id,
            category_id,
        }
    }

    fn product_body(category_id: &str, name: &str) -> NewProduct {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "categoryId": category_id,
            "price": 49.5,
            "inventory": 3
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let s = setup();

        let (status, Json(created)) = create_product(
            State(s.state.clone()),
            Path(s.store_id.clone()),
            Json(product_body(&s.category_id, "Popsicle Deck")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let err = create_product(
            State(s.state.clone()),
            Path(s.store_id.clone()),
            Json(product_body(&s.category_id, "Popsicle Deck")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let status = update_product(
            State(s.state.clone()),
            Path((s.store_id.clone(), created.id.clone())),
            Json(product_body(&s.category_id, "Cruiser Deck")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(page) = list_store_products(
            State(s.state.clone()),
            Path(s.store_id.clone()),
            RawQuery(Some("name=cruiser".to_string())),
        )
        .await
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Cruiser Deck");

        let status = delete_product(
            State(s.state.clone()),
            Path((s.store_id.clone(), created.id.clone())),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = delete_product(State(s.state), Path((s.store_id, created.id)))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_in_other_store_is_not_found() {
        let s = setup();
        let (_, Json(created)) = create_product(
            State(s.state.clone()),
            Path(s.store_id.clone()),
            Json(product_body(&s.category_id, "Popsicle Deck")),
        )
        .await
        .unwrap();

        let err = update_product(
            State(s.state),
            Path(("someone-else".to_string(), created.id)),
            Json(product_body(&s.category_id, "Stolen Deck")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    fn store_body(name: &str) -> NewStore {
        serde_json::from_value(serde_json::json!({
            "userId": "user_1",
            "name": name,
            "description": "Wheels and bearings"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_update_store() {
        let s = setup();

        let (status, Json(created)) =
            create_store(State(s.state.clone()), Json(store_body("Wheel House")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let err = create_store(State(s.state.clone()), Json(store_body("wheel house")))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let err = create_store(State(s.state.clone()), Json(store_body("?!")))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let status = update_store(
            State(s.state.clone()),
            Path(created.id.clone()),
            Json(store_body("Wheel House East")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(store) = get_store(State(s.state.clone()), Path(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(store.name, "Wheel House East");
        assert_eq!(store.description.as_deref(), Some("Wheels and bearings"));

        // Taking another store's name
        let err = update_store(
            State(s.state.clone()),
            Path(created.id),
            Json(store_body("Board Room")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let err = update_store(
            State(s.state),
            Path("missing".to_string()),
            Json(store_body("Elsewhere")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_and_list_stores() {
        let s = setup();

        let Json(store) = get_store(State(s.state.clone()), Path(s.store_id.clone()))
            .await
            .unwrap();
        assert_eq!(store.name, "Board Room");

        let err = get_store(State(s.state.clone()), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let Json(page) = list_stores(State(s.state.clone()), RawQuery(None))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);

        let Json(active) = list_stores(State(s.state), RawQuery(Some("active=true".into())))
            .await
            .unwrap();
        assert!(active.items.is_empty());
        assert_eq!(active.page_count, 0);
    }
}
