//! Follow edges between users

use chrono::Utc;

use super::database::Database;
use super::models::*;
use crate::error::AppError;

const FOLLOW_ENTRY_COLUMNS: &str =
    "u.id, u.username, u.display_name, u.avatar_url, f.is_accepted, f.created_at AS followed_at";

impl Database {
    /// Create a follow edge
    ///
    /// The edge is accepted immediately when the followed account is public
    /// and left pending when it is private.
    ///
    /// # Returns
    /// Whether the new edge is accepted.
    ///
    /// # Errors
    /// - `NotFound` if the followed user does not exist
    /// - `AlreadyExists` if an edge (pending or accepted) already exists
    pub async fn insert_follow(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<bool, AppError> {
        let mut tx = self.begin_write().await?;
        let result = self
            .bounded(async {
                let conn = tx.conn()?;

                let followed_private: bool = sqlx::query_scalar(
                    "SELECT is_private FROM users WHERE id = ? AND deleted_at IS NULL",
                )
                .bind(followed_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(AppError::NotFound)?;

                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND followed_id = ?)",
                )
                .bind(follower_id)
                .bind(followed_id)
                .fetch_one(&mut *conn)
                .await?;
                if exists {
                    return Err(AppError::AlreadyExists(
                        "already following or requested".to_string(),
                    ));
                }

                let is_accepted = !followed_private;
                sqlx::query(
                    "INSERT INTO follows (follower_id, followed_id, is_accepted, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(follower_id)
                .bind(followed_id)
                .bind(is_accepted)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

                Ok(is_accepted)
            })
            .await;
        tx.finish(result).await
    }

    /// Remove a follow edge in either state
    ///
    /// # Returns
    /// Whether an edge existed.
    pub async fn delete_follow(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
            .bind(follower_id)
            .bind(followed_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a follow edge accepted; already-accepted edges are left as-is
    ///
    /// # Errors
    /// `NotFound` if no edge exists
    pub async fn accept_follow(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;
        let result = self
            .bounded(async {
                let conn = tx.conn()?;

                let accepted: bool = sqlx::query_scalar(
                    "SELECT is_accepted FROM follows WHERE follower_id = ? AND followed_id = ?",
                )
                .bind(follower_id)
                .bind(followed_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(AppError::NotFound)?;
                if accepted {
                    return Ok(());
                }

                sqlx::query(
                    "UPDATE follows SET is_accepted = 1 WHERE follower_id = ? AND followed_id = ?",
                )
                .bind(follower_id)
                .bind(followed_id)
                .execute(&mut *conn)
                .await?;
                Ok(())
            })
            .await;
        tx.finish(result).await
    }

    /// Delete a pending follow edge
    ///
    /// # Returns
    /// Whether a pending edge existed.
    pub async fn reject_follow(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE follower_id = ? AND followed_id = ? AND is_accepted = 0",
        )
        .bind(follower_id)
        .bind(followed_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Acceptance state of the edge `follower -> followed`, if any
    pub async fn get_follow_edge(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<Option<bool>, AppError> {
        let accepted = sqlx::query_scalar::<_, bool>(
            "SELECT is_accepted FROM follows WHERE follower_id = ? AND followed_id = ?",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(accepted)
    }

    /// Accepted followers of a user, newest first
    pub async fn list_followers(
        &self,
        user_id: &EntityId,
        page: Page,
    ) -> Result<Vec<FollowEntry>, AppError> {
        let entries = sqlx::query_as::<_, FollowEntry>(&format!(
            r#"
            SELECT {FOLLOW_ENTRY_COLUMNS}
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.followed_id = ? AND f.is_accepted = 1 AND u.deleted_at IS NULL
            ORDER BY f.created_at DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    /// Users a user follows (accepted edges), newest first
    pub async fn list_following(
        &self,
        user_id: &EntityId,
        page: Page,
    ) -> Result<Vec<FollowEntry>, AppError> {
        let entries = sqlx::query_as::<_, FollowEntry>(&format!(
            r#"
            SELECT {FOLLOW_ENTRY_COLUMNS}
            FROM follows f
            JOIN users u ON u.id = f.followed_id
            WHERE f.follower_id = ? AND f.is_accepted = 1 AND u.deleted_at IS NULL
            ORDER BY f.created_at DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    /// Pending requests targeting a user, oldest first
    pub async fn list_pending_follow_requests(
        &self,
        user_id: &EntityId,
        page: Page,
    ) -> Result<Vec<FollowEntry>, AppError> {
        let entries = sqlx::query_as::<_, FollowEntry>(&format!(
            r#"
            SELECT {FOLLOW_ENTRY_COLUMNS}
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.followed_id = ? AND f.is_accepted = 0 AND u.deleted_at IS NULL
            ORDER BY f.created_at ASC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }
}
