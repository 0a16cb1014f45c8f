use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, ApiJson,
};
use crate::{
    entities::{OrderLineModel, UserId},
    errors::{ApiError, ErrorResponse},
    services::OrderSummary,
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for checkout and order history
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/:user_id", get(list_orders))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderRequest {
    #[validate(range(min = 1))]
    pub user_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub placed_at: DateTime<Utc>,
}

impl From<OrderLineModel> for OrderLineResponse {
    fn from(model: OrderLineModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            quantity: model.quantity,
            placed_at: model.placed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderSummaryResponse {
    pub user_id: i32,
    pub line_count: usize,
    pub lines: Vec<OrderLineResponse>,
    pub placed_at: DateTime<Utc>,
}

impl From<OrderSummary> for OrderSummaryResponse {
    fn from(summary: OrderSummary) -> Self {
        Self {
            user_id: summary.user_id,
            line_count: summary.line_count,
            lines: summary.lines.into_iter().map(OrderLineResponse::from).collect(),
            placed_at: summary.placed_at,
        }
    }
}

/// Convert the user's whole cart into an order
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderSummaryResponse),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
        (status = 409, description = "Cart changed concurrently", body = ErrorResponse),
        (status = 422, description = "Cart is empty", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let summary = state
        .services
        .checkout
        .place_order(payload.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(OrderSummaryResponse::from(summary)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{user_id}",
    params(("user_id" = i32, Path, description = "Order owner")),
    responses((status = 200, description = "Order history", body = [OrderLineResponse])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let lines = state
        .services
        .checkout
        .list_orders(user_id)
        .await
        .map_err(map_service_error)?;

    let body: Vec<OrderLineResponse> = lines.into_iter().map(OrderLineResponse::from).collect();
    Ok(success_response(body))
}
