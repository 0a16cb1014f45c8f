use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, ApiJson,
};
use crate::{
    entities::{ProductId, ProductModel},
    errors::{ApiError, ErrorResponse},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for catalog endpoints
pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:product_id", get(get_product))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Unit price; negative values are rejected
    pub price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductCreatedResponse {
    pub success: bool,
    pub message: String,
    pub product_id: i32,
}

#[utoipa::path(
    get,
    path = "/api/products",
    responses((status = 200, description = "All products", body = [ProductResponse])),
    tag = "catalog"
)]
pub async fn list_products(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .list_products()
        .await
        .map_err(map_service_error)?;

    let body: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(body))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductCreatedResponse),
        (status = 400, description = "Invalid name or negative price", body = ErrorResponse),
    ),
    tag = "catalog"
)]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product_id = state
        .services
        .catalog
        .create_product(&payload.name, payload.price)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ProductCreatedResponse {
        success: true,
        message: "Product created".to_string(),
        product_id,
    }))
}

#[utoipa::path(
    get,
    path = "/api/products/{product_id}",
    params(("product_id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<ProductId>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}
