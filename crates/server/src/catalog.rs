use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use storefront_core::{Product, ProductId};

use crate::app::{new_correlation_id, AppState};
use crate::error::ApiError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(product_detail))
        .route("/category/{name}", get(category_products))
}

async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let correlation_id = new_correlation_id();
    let products = state
        .products
        .list()
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(Json(products))
}

async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let correlation_id = new_correlation_id();
    let product_id = id
        .parse::<ProductId>()
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;

    state
        .products
        .find_by_id(product_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!("product {product_id} not found"), &correlation_id)
        })
}

async fn category_products(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let correlation_id = new_correlation_id();
    state
        .products
        .list_by_category(&name)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("category `{name}` not found"), &correlation_id))
}
