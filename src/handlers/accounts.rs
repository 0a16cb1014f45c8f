use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, ApiJson,
};
use crate::{
    entities::{UserId, UserModel},
    errors::{ApiError, ErrorResponse},
    services::RegisterUserInput,
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

/// Creates the router for registration, login and user lookup
pub fn accounts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/users/:user_id", get(get_user))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Acknowledgement carrying the affected user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub success: bool,
    pub message: String,
    pub user_id: i32,
}

/// Public view of a user; the credential is never returned
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl From<UserModel> for UserResponse {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AccountResponse),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse),
    ),
    tag = "accounts"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user_id = state
        .services
        .accounts
        .register(RegisterUserInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(AccountResponse {
        success: true,
        message: "Registration successful".to_string(),
        user_id,
    }))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = AccountResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    ),
    tag = "accounts"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user_id = state
        .services
        .accounts
        .authenticate(&payload.username, &payload.password)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(AccountResponse {
        success: true,
        message: "Login successful".to_string(),
        user_id,
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "accounts"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .services
        .accounts
        .get_user(user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(UserResponse::from(user)))
}
