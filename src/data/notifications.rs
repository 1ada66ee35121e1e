//! Stored notifications

use chrono::Utc;

use super::database::Database;
use super::models::*;
use crate::error::AppError;

impl Database {
    /// Store a notification
    pub async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<EntityId, AppError> {
        let id = EntityId::new();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, actor_id, post_id, parent_post_id,
                notification_type, read, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&notification.recipient_id)
        .bind(&notification.actor_id)
        .bind(&notification.post_id)
        .bind(&notification.parent_post_id)
        .bind(notification.kind.as_str())
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(id)
    }

    /// Notifications of a user, newest first, joined with actor and post text
    pub async fn list_notifications(
        &self,
        user_id: &EntityId,
        page: Page,
    ) -> Result<Vec<Notification>, AppError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT n.id, n.user_id, n.actor_id, n.post_id, n.parent_post_id,
                n.notification_type, n.read, n.created_at,
                a.username AS actor_username,
                a.display_name AS actor_display_name,
                a.avatar_url AS actor_avatar_url,
                p.content AS post_content,
                pp.content AS parent_post_content
            FROM notifications n
            JOIN users a ON a.id = n.actor_id
            LEFT JOIN posts p ON p.id = n.post_id AND p.deleted_at IS NULL
            LEFT JOIN posts pp ON pp.id = n.parent_post_id AND pp.deleted_at IS NULL
            WHERE n.user_id = ? AND n.deleted_at IS NULL
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    /// Number of unread, undeleted notifications
    pub async fn count_unread_notifications(&self, user_id: &EntityId) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    /// Mark one of the recipient's notifications read
    ///
    /// # Returns
    /// Whether the notification exists and belongs to `user_id`.
    pub async fn mark_notification_read(
        &self,
        id: &EntityId,
        user_id: &EntityId,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET read = 1, updated_at = ? WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark every notification of the recipient read
    pub async fn mark_all_notifications_read(&self, user_id: &EntityId) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET read = 1, updated_at = ? WHERE user_id = ? AND read = 0 AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    /// Soft-delete one of the recipient's notifications
    pub async fn soft_delete_notification(
        &self,
        id: &EntityId,
        user_id: &EntityId,
    ) -> Result<bool, AppError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE notifications SET deleted_at = ?, updated_at = ? WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
