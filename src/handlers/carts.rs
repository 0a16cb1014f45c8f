use crate::handlers::common::{map_service_error, success_response, validate_input, ApiJson};
use crate::{
    entities::UserId,
    errors::{ApiError, ErrorResponse},
    services::CartItem,
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cart", post(add_to_cart))
        .route("/cart/:user_id", get(list_cart))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddToCartRequest {
    pub user_id: i32,
    pub product_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddToCartResponse {
    pub success: bool,
    pub message: String,
    pub cart_line_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItemResponse {
    pub product_id: i32,
    pub quantity: i32,
}

impl From<CartItem> for CartItemResponse {
    fn from(item: CartItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
        }
    }
}

/// Add item to cart, merging with an existing line for the same product
#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added", body = AddToCartResponse),
        (status = 400, description = "Non-positive quantity", body = ErrorResponse),
        (status = 404, description = "Unknown user or product", body = ErrorResponse),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<AddToCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart_line_id = state
        .services
        .cart
        .add_item(payload.user_id, payload.product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(AddToCartResponse {
        success: true,
        message: "Item added to cart".to_string(),
        cart_line_id,
    }))
}

#[utoipa::path(
    get,
    path = "/api/cart/{user_id}",
    params(("user_id" = i32, Path, description = "Cart owner")),
    responses((status = 200, description = "Cart contents", body = [CartItemResponse])),
    tag = "cart"
)]
pub async fn list_cart(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .cart
        .list_items(user_id)
        .await
        .map_err(map_service_error)?;

    let body: Vec<CartItemResponse> = items.into_iter().map(CartItemResponse::from).collect();
    Ok(success_response(body))
}
