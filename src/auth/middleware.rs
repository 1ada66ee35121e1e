//! Authentication extractors
//!
//! Resolve the bearer token of a request into the caller's user ID.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::AppState;
use crate::data::EntityId;
use crate::error::AppError;

/// Bearer token of the request, if any
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_owned())
}

/// Verified caller identity, cached in request extensions
#[derive(Debug, Clone)]
struct Authenticated(EntityId);

/// Extractor for the current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(user_id): CurrentUser) -> impl IntoResponse {
///     user_id.to_string()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub EntityId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(Authenticated(id)) = parts.extensions.get::<Authenticated>().cloned() {
            return Ok(CurrentUser(id));
        }

        let state = AppState::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let user_id = state.auth.verify_token(&token).await?;
        parts.extensions.insert(Authenticated(user_id.clone()));

        Ok(CurrentUser(user_id))
    }
}

/// Optional current user extractor
///
/// Anonymous requests and requests with unusable tokens yield `None`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<EntityId>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(Authenticated(id)) = parts.extensions.get::<Authenticated>().cloned() {
            return Ok(MaybeUser(Some(id)));
        }

        let app_state = AppState::from_ref(state);
        let user_id = match bearer_token(&parts.headers) {
            Some(token) => app_state.auth.verify_token(&token).await.ok(),
            None => None,
        };

        if let Some(id) = &user_id {
            parts.extensions.insert(Authenticated(id.clone()));
        }

        Ok(MaybeUser(user_id))
    }
}
