//! Notification endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::dto::{MarkedReadResponse, PaginationParams, UnreadCountResponse, path_id};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::Notification;
use crate::error::AppError;

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(
        state
            .notifications
            .get_notifications(&user_id, params.into())
            .await?,
    ))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let count = state.notifications.get_unread_count(&user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// PUT /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let notification_id = path_id(&id)?;
    state
        .notifications
        .mark_as_read(&notification_id, &user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<MarkedReadResponse>, AppError> {
    let updated = state.notifications.mark_all_as_read(&user_id).await?;
    Ok(Json(MarkedReadResponse { updated }))
}

/// DELETE /api/notifications/:id
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let notification_id = path_id(&id)?;
    state
        .notifications
        .delete_notification(&notification_id, &user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
