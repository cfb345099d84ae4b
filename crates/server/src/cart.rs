use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storefront_core::cart::parse_quantity;
use storefront_core::{Cart, CartLines, Product, ProductId, Quantity};
use tracing::info;

use crate::app::{new_correlation_id, AppState};
use crate::error::ApiError;
use crate::session::SessionScope;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart_summary))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/update", post(update_cart))
        .route("/cart/delete", post(delete_from_cart))
}

/// Form-style cart request. Ids and quantities arrive either as JSON numbers
/// or as numeric strings.
#[derive(Debug, Default, Deserialize)]
pub struct CartRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub product_qty: Option<Value>,
}

impl CartRequest {
    fn require_post(&self, correlation_id: &str) -> Result<(), ApiError> {
        if self.action == "post" {
            Ok(())
        } else {
            Err(ApiError::bad_request(
                format!("unsupported cart action `{}`", self.action),
                correlation_id,
            ))
        }
    }

    fn product_id(&self, correlation_id: &str) -> Result<ProductId, ApiError> {
        let raw = scalar_text(self.product_id.as_ref(), "product_id", correlation_id)?;
        raw.parse::<ProductId>().map_err(|error| ApiError::from_application(error, correlation_id))
    }

    fn quantity(&self, correlation_id: &str) -> Result<Quantity, ApiError> {
        let raw = scalar_text(self.product_qty.as_ref(), "product_qty", correlation_id)?;
        parse_quantity(&raw).map_err(|error| ApiError::from_application(error, correlation_id))
    }
}

/// Maps body rejections (bad JSON, wrong content type) onto the JSON error body.
fn cart_request(
    payload: Result<Json<CartRequest>, JsonRejection>,
    correlation_id: &str,
) -> Result<CartRequest, ApiError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text(), correlation_id))
}

fn scalar_text(
    value: Option<&Value>,
    field: &str,
    correlation_id: &str,
) -> Result<String, ApiError> {
    match value {
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(ApiError::bad_request(
            format!("`{field}` must be a number, got {other}"),
            correlation_id,
        )),
        None => Err(ApiError::bad_request(format!("`{field}` is required"), correlation_id)),
    }
}

#[derive(Debug, Serialize)]
pub struct CartSummaryResponse {
    pub cart_products: Vec<Product>,
    pub quantities: CartLines,
    pub totals: Decimal,
}

async fn cart_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let mut scope = SessionScope::open(&state, &headers, new_correlation_id()).await?;
    let correlation_id = scope.correlation_id().to_string();

    let summary = {
        let cart = Cart::attach(scope.session_mut())
            .map_err(|error| ApiError::from_application(error, &correlation_id))?;
        cart.summary(&*state.products)
            .await
            .map_err(|error| ApiError::from_application(error, &correlation_id))?
    };

    let body = CartSummaryResponse {
        cart_products: summary.products,
        quantities: summary.quantities,
        totals: summary.total,
    };
    scope.finish(&state, Json(body)).await
}

async fn add_to_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CartRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let correlation_id = new_correlation_id();
    let request = cart_request(payload, &correlation_id)?;
    request.require_post(&correlation_id)?;
    let product_id = request.product_id(&correlation_id)?;
    let quantity = request.quantity(&correlation_id)?;
    let product = find_product(&state, product_id, &correlation_id).await?;

    let mut scope = SessionScope::open(&state, &headers, correlation_id.clone()).await?;
    let size = {
        let mut cart = Cart::attach(scope.session_mut())
            .map_err(|error| ApiError::from_application(error, &correlation_id))?;
        cart.add(&product, quantity);
        cart.size()
    };

    info!(
        event_name = "cart.add",
        correlation_id = %correlation_id,
        product_id = %product_id,
        quantity,
        size,
        "product added to cart"
    );
    scope.finish(&state, Json(json!({ "qty": size }))).await
}

async fn update_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CartRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let correlation_id = new_correlation_id();
    let request = cart_request(payload, &correlation_id)?;
    request.require_post(&correlation_id)?;
    let product_id = request.product_id(&correlation_id)?;
    let quantity = request.quantity(&correlation_id)?;
    find_product(&state, product_id, &correlation_id).await?;

    let mut scope = SessionScope::open(&state, &headers, correlation_id.clone()).await?;
    {
        let mut cart = Cart::attach(scope.session_mut())
            .map_err(|error| ApiError::from_application(error, &correlation_id))?;
        cart.update(product_id, quantity);
    }

    info!(
        event_name = "cart.update",
        correlation_id = %correlation_id,
        product_id = %product_id,
        quantity,
        "cart quantity updated"
    );
    scope.finish(&state, Json(json!({ "qty": quantity }))).await
}

async fn delete_from_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CartRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let correlation_id = new_correlation_id();
    let request = cart_request(payload, &correlation_id)?;
    request.require_post(&correlation_id)?;
    let product_id = request.product_id(&correlation_id)?;

    let mut scope = SessionScope::open(&state, &headers, correlation_id.clone()).await?;
    let (removed, size) = {
        let mut cart = Cart::attach(scope.session_mut())
            .map_err(|error| ApiError::from_application(error, &correlation_id))?;
        let removed = cart.remove(product_id);
        (removed, cart.size())
    };

    info!(
        event_name = "cart.delete",
        correlation_id = %correlation_id,
        product_id = %product_id,
        removed = removed.is_some(),
        size,
        "product removed from cart"
    );
    scope.finish(&state, Json(json!({ "product": product_id, "qty": size }))).await
}

async fn find_product(
    state: &AppState,
    product_id: ProductId,
    correlation_id: &str,
) -> Result<Product, ApiError> {
    state
        .products
        .find_by_id(product_id)
        .await
        .map_err(|error| ApiError::from_application(error, correlation_id))?
        .ok_or_else(|| {
            ApiError::not_found(format!("product {product_id} not found"), correlation_id)
        })
}
