//! Authentication middleware for JWT token validation

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{error::ApiError, models::user::User, state::AppState};

/// Resolve the bearer token in `headers` to a user record.
///
/// Any failure along the way is a uniform 401: a missing header, a bad
/// or expired token, and a token whose subject no longer exists all
/// look the same to the caller.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.jwt_service.verify(token).map_err(|e| {
        debug!("Token validation failed: {}", e);
        ApiError::Unauthorized
    })?;

    let user = state
        .user_repository
        .find_by_username(&claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(user)
}

/// Authentication middleware: attaches the resolved [`User`] to request
/// extensions for protected routes
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, req.headers()).await?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
