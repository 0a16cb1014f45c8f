use axum::Json;
use utoipa::OpenApi;

use crate::errors::ErrorResponse;
use crate::handlers::{
    accounts::{self, AccountResponse, LoginRequest, RegisterRequest, UserResponse},
    carts::{self, AddToCartRequest, AddToCartResponse, CartItemResponse},
    health::{self, ComponentStatus, HealthResponse},
    orders::{self, OrderLineResponse, OrderSummaryResponse, PlaceOrderRequest},
    products::{self, CreateProductRequest, ProductCreatedResponse, ProductResponse},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
# Storefront API

User accounts, a product catalog, per-user carts and checkout.

## Checkout

`POST /api/orders` converts every line of the user's cart into order lines and
empties the cart in one transaction. An empty cart is rejected with `422`.

## Error Handling

Failures share one body shape:

```json
{
  "error": "Not Found",
  "message": "Not found: User 7 not found",
  "request_id": "2b1f0d3e-...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
"#
    ),
    paths(
        accounts::register,
        accounts::login,
        accounts::get_user,
        products::list_products,
        products::create_product,
        products::get_product,
        carts::add_to_cart,
        carts::list_cart,
        orders::place_order,
        orders::list_orders,
        health::health_check,
    ),
    components(schemas(
        ErrorResponse,
        RegisterRequest,
        LoginRequest,
        AccountResponse,
        UserResponse,
        CreateProductRequest,
        ProductResponse,
        ProductCreatedResponse,
        AddToCartRequest,
        AddToCartResponse,
        CartItemResponse,
        PlaceOrderRequest,
        OrderLineResponse,
        OrderSummaryResponse,
        HealthResponse,
        ComponentStatus,
    )),
    tags(
        (name = "accounts", description = "Registration and login"),
        (name = "catalog", description = "Products"),
        (name = "cart", description = "Per-user carts"),
        (name = "orders", description = "Checkout and order history"),
        (name = "health", description = "Liveness and readiness"),
    )
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/api/register",
            "/api/login",
            "/api/users/{user_id}",
            "/api/products",
            "/api/products/{product_id}",
            "/api/cart",
            "/api/cart/{user_id}",
            "/api/orders",
            "/api/orders/{user_id}",
            "/health",
        ] {
            assert!(paths.contains(&expected), "missing path {}", expected);
        }
    }

    #[test]
    fn document_serializes() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("ErrorResponse"));
    }
}
