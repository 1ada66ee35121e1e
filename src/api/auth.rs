//! Registration, login and token endpoints

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use super::dto::{LoginRequest, RefreshRequest, RegisterResponse};
use crate::AppState;
use crate::auth::{Registration, TokenPair, bearer_token};
use crate::data::User;
use crate::error::AppError;

/// POST /api/auth/register
///
/// Creates the account and signs it in.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Registration>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = state.auth.register(req).await?;
    let tokens = state.auth.issue_tokens(&user.id)?;
    state.accounts.record_login(&user.id).await;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user, tokens })))
}

/// POST /api/auth/login
///
/// `username` may also be the account's email address.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let user_id = state.auth.authenticate(&req.username, &req.password).await?;
    let tokens = state.auth.issue_tokens(&user_id)?;
    state.accounts.record_login(&user_id).await;

    Ok(Json(tokens))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    Ok(Json(state.auth.refresh_token(&req.refresh_token).await?))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<User>, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    Ok(Json(state.auth.get_user_from_token(&token).await?))
}
