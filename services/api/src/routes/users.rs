//! User routes: registration, login, and user lookups

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    models::user::{LoginRequest, RegisterRequest, TokenResponse, User, UserResponse},
    policy::{Action, authorize},
    repositories::is_unique_violation,
    state::AppState,
    validation::{validate_email, validate_password, validate_username},
};

/// Register a new user. The role is always `user`.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_username(&payload.username).map_err(ApiError::Validation)?;
    validate_email(&payload.email).map_err(ApiError::Validation)?;
    validate_password(&payload.password).map_err(ApiError::Validation)?;

    if state
        .user_repository
        .find_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Validation("Username already exists".to_string()));
    }

    let user = state
        .user_repository
        .create(&payload.username, &payload.email, &payload.password)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Validation("Username or email already exists".to_string())
            } else {
                ApiError::Internal(e)
            }
        })?;

    info!("Registered user {}", user.username);
    Ok(Json(UserResponse::from(user)))
}

/// Login and generate a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_username(&payload.username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !state
        .user_repository
        .verify_password(&user, &payload.password)?
    {
        return Err(ApiError::Unauthorized);
    }

    let access_token = state
        .jwt_service
        .issue(&user.username)
        .map_err(ApiError::Internal)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// The authenticated caller's own record
pub async fn me(Extension(user): Extension<User>) -> impl IntoResponse {
    Json(UserResponse::from(user))
}

/// List every user (admin only)
pub async fn list_all(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<impl IntoResponse> {
    authorize(&user, Action::ListUsers)?;

    let users = state.user_repository.list_all().await?;
    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();

    Ok(Json(users))
}

/// Look up one user by ID (admin only)
pub async fn get_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    authorize(&user, Action::ReadUser)?;

    let found = state
        .user_repository
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(found)))
}
