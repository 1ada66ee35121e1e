//! Profile and follow-graph endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::dto::{PaginationParams, UpdateAvatarRequest, path_id};
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::data::{FollowEntry, FollowOutcome, FollowStatus, Post, ProfileUpdate, UserProfile};
use crate::error::AppError;

// =============================================================================
// Profiles
// =============================================================================

/// GET /api/users/:username
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.accounts.get_profile_by_username(&username).await?))
}

/// PUT /api/users/me
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.accounts.update_profile(&user_id, update).await?))
}

/// PUT /api/users/me/avatar
pub async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<UpdateAvatarRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(
        state
            .accounts
            .update_avatar(&user_id, &req.avatar_url)
            .await?,
    ))
}

/// GET /api/users/:username/posts
pub async fn user_posts(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Post>>, AppError> {
    let posts = state
        .posts
        .get_user_posts_by_username(&username, viewer.as_ref(), params.into())
        .await?;
    Ok(Json(posts))
}

/// GET /api/users/:username/replies
pub async fn user_replies(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Post>>, AppError> {
    let posts = state
        .posts
        .get_user_replies_by_username(&username, viewer.as_ref(), params.into())
        .await?;
    Ok(Json(posts))
}

/// GET /api/users/:username/likes
pub async fn user_likes(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Post>>, AppError> {
    let posts = state
        .posts
        .get_user_liked_posts_by_username(&username, viewer.as_ref(), params.into())
        .await?;
    Ok(Json(posts))
}

// =============================================================================
// Follow graph
// =============================================================================

/// GET /api/users/:id/followers
pub async fn followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<FollowEntry>>, AppError> {
    let user_id = path_id(&id)?;
    Ok(Json(state.follows.get_followers(&user_id, params.into()).await?))
}

/// GET /api/users/:id/following
pub async fn following(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<FollowEntry>>, AppError> {
    let user_id = path_id(&id)?;
    Ok(Json(state.follows.get_following(&user_id, params.into()).await?))
}

/// GET /api/users/:id/follow-status
pub async fn follow_status(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FollowStatus>, AppError> {
    let target = path_id(&id)?;
    Ok(Json(state.follows.get_follow_status(&caller, &target).await?))
}

/// POST /api/users/:id/follow
pub async fn follow(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<FollowOutcome>), AppError> {
    let target = path_id(&id)?;
    let outcome = state.follows.follow_user(&caller, &target).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// DELETE /api/users/:id/follow
pub async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let target = path_id(&id)?;
    state.follows.unfollow_user(&caller, &target).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/follow-requests
pub async fn follow_requests(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<FollowEntry>>, AppError> {
    Ok(Json(
        state
            .follows
            .get_pending_follow_requests(&caller, params.into())
            .await?,
    ))
}

/// POST /api/follow-requests/:id/accept
///
/// `:id` is the requesting user.
pub async fn accept_follow_request(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let follower = path_id(&id)?;
    state.follows.accept_follow_request(&follower, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/follow-requests/:id/reject
pub async fn reject_follow_request(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let follower = path_id(&id)?;
    state.follows.reject_follow_request(&follower, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}
