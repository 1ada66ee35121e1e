//! Post and interaction endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::dto::{CreatePostRequest, LikedResponse, PaginationParams, UpdatePostRequest, path_id};
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::data::Post;
use crate::error::AppError;
use crate::service::CreatePost;

/// GET /api/posts
pub async fn list_posts(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Post>>, AppError> {
    let posts = state.posts.get_posts(viewer.as_ref(), params.into()).await?;
    Ok(Json(posts))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let reply_to = req.reply_to_post_id.as_deref().map(path_id).transpose()?;
    let input = CreatePost {
        content: req.content,
        is_private: req.is_private,
        reply_to,
        media_urls: req.media_urls,
        allow_replies: req.allow_replies,
    };

    let post = state.posts.create_post(&user_id, input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let post_id = path_id(&id)?;
    Ok(Json(state.posts.get_post(&post_id, viewer.as_ref()).await?))
}

/// PUT /api/posts/:id
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let post_id = path_id(&id)?;
    let post = state
        .posts
        .update_post_content(&post_id, &user_id, &req.content)
        .await?;
    Ok(Json(post))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post_id = path_id(&id)?;
    state.posts.delete_post(&post_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/posts/:id/replies
pub async fn get_replies(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Post>>, AppError> {
    let post_id = path_id(&id)?;
    let replies = state
        .posts
        .get_post_replies(&post_id, viewer.as_ref(), params.into())
        .await?;
    Ok(Json(replies))
}

/// POST /api/posts/:id/like
pub async fn like_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post_id = path_id(&id)?;
    state.posts.like_post(&post_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/posts/:id/like
pub async fn unlike_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post_id = path_id(&id)?;
    state.posts.unlike_post(&post_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/posts/:id/liked
pub async fn has_liked(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<LikedResponse>, AppError> {
    let post_id = path_id(&id)?;
    let liked = state.posts.has_liked(&post_id, viewer.as_ref()).await?;
    Ok(Json(LikedResponse { liked }))
}

/// POST /api/posts/:id/bookmark
pub async fn bookmark_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post_id = path_id(&id)?;
    state.posts.bookmark_post(&post_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/posts/:id/bookmark
pub async fn unbookmark_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post_id = path_id(&id)?;
    state.posts.unbookmark_post(&post_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/posts/:id/repost
pub async fn repost_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post_id = path_id(&id)?;
    state.posts.repost_post(&post_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/posts/:id/repost
pub async fn unrepost_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post_id = path_id(&id)?;
    state.posts.unrepost_post(&post_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/bookmarks
pub async fn get_bookmarks(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.posts.get_bookmarks(&user_id, params.into()).await?))
}
