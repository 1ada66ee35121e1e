//! Posts and the per-user interaction ledgers (likes, bookmarks, reposts)

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::database::Database;
use super::models::*;
use crate::error::AppError;

/// A per-(user, post) membership table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ledger {
    Likes,
    Bookmarks,
    Reposts,
}

impl Ledger {
    fn table(&self) -> &'static str {
        match self {
            Ledger::Likes => "likes",
            Ledger::Bookmarks => "bookmarks",
            Ledger::Reposts => "reposts",
        }
    }

    /// Denormalized counter on `posts` mirroring this ledger, if any
    fn counter(&self) -> Option<&'static str> {
        match self {
            Ledger::Likes => Some("like_count"),
            Ledger::Bookmarks => None,
            Ledger::Reposts => Some("repost_count"),
        }
    }

    /// Singular noun used in `AlreadyExists` messages
    pub fn noun(&self) -> &'static str {
        match self {
            Ledger::Likes => "like",
            Ledger::Bookmarks => "bookmark",
            Ledger::Reposts => "repost",
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostGuard {
    user_id: EntityId,
    allow_replies: bool,
}

/// Owner and reply policy of a live post visible to `caller`, read on the
/// transaction's connection
///
/// Private posts resolve only for their author and accepted followers, the
/// same rule `post_select` applies to reads.
async fn live_post(
    conn: &mut SqliteConnection,
    post_id: &EntityId,
    caller: &EntityId,
) -> Result<Option<PostGuard>, AppError> {
    let guard = sqlx::query_as::<_, PostGuard>(
        r#"
        SELECT p.user_id, p.allow_replies FROM posts p
        WHERE p.id = ? AND p.deleted_at IS NULL
          AND (p.is_private = 0 OR p.user_id = ? OR EXISTS(
              SELECT 1 FROM follows f
              WHERE f.followed_id = p.user_id AND f.is_accepted = 1 AND f.follower_id = ?))
        "#,
    )
    .bind(post_id)
    .bind(caller)
    .bind(caller)
    .fetch_optional(conn)
    .await?;
    Ok(guard)
}

/// Start the canonical post SELECT.
///
/// Every read path goes through here so counters, the derived reply count,
/// viewer annotations and visibility are computed the same way. Callers
/// append further `AND ...` predicates, ordering and paging.
fn post_select(viewer: Option<&EntityId>) -> QueryBuilder<'static, Sqlite> {
    let viewer = viewer.cloned();
    let mut qb = QueryBuilder::new(
        r#"
        SELECT p.id, p.user_id, p.content, p.is_private, p.reply_to_post_id,
            p.allow_replies, p.media_urls, p.like_count, p.repost_count,
            (SELECT COUNT(*) FROM posts r WHERE r.reply_to_post_id = p.id AND r.deleted_at IS NULL) AS reply_count,
            p.created_at, p.updated_at,
            u.username AS author_username,
            u.display_name AS author_display_name,
            u.avatar_url AS author_avatar_url,
            EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = "#,
    );
    qb.push_bind(viewer.clone());
    qb.push(") AS has_liked, EXISTS(SELECT 1 FROM bookmarks b WHERE b.post_id = p.id AND b.user_id = ");
    qb.push_bind(viewer.clone());
    qb.push(") AS has_bookmarked, EXISTS(SELECT 1 FROM reposts s WHERE s.post_id = p.id AND s.user_id = ");
    qb.push_bind(viewer.clone());
    qb.push(
        r#") AS has_reposted
        FROM posts p
        JOIN users u ON u.id = p.user_id
        WHERE p.deleted_at IS NULL
          AND (p.is_private = 0 OR p.user_id = "#,
    );
    qb.push_bind(viewer.clone());
    qb.push(" OR EXISTS(SELECT 1 FROM follows f WHERE f.followed_id = p.user_id AND f.is_accepted = 1 AND f.follower_id = ");
    qb.push_bind(viewer);
    qb.push("))");
    qb
}

fn push_page(qb: &mut QueryBuilder<'static, Sqlite>, page: Page) {
    qb.push(" LIMIT ");
    qb.push_bind(page.limit);
    qb.push(" OFFSET ");
    qb.push_bind(page.offset);
}

impl Database {
    // =========================================================================
    // Post lifecycle
    // =========================================================================

    /// Insert a post, validating the reply parent in the same transaction
    ///
    /// # Returns
    /// The new post ID and, for replies, the parent's owner.
    ///
    /// # Errors
    /// - `NotFound` if the parent is missing or deleted
    /// - `Forbidden` if the parent does not allow replies
    pub async fn insert_post(
        &self,
        new_post: &NewPost,
    ) -> Result<(EntityId, Option<EntityId>), AppError> {
        let id = EntityId::new();
        let now = Utc::now();
        let media_urls = serde_json::to_string(&new_post.media_urls)
            .map_err(|e| AppError::Internal(e.into()))?;

        let mut tx = self.begin_write().await?;
        let result = self
            .bounded(async {
                let conn = tx.conn()?;

                let parent_owner = match &new_post.reply_to {
                    Some(parent_id) => {
                        let parent = live_post(&mut *conn, parent_id, &new_post.author_id)
                            .await?
                            .ok_or(AppError::NotFound)?;
                        if !parent.allow_replies {
                            return Err(AppError::Forbidden);
                        }
                        Some(parent.user_id)
                    }
                    None => None,
                };

                sqlx::query(
                    r#"
                    INSERT INTO posts (
                        id, user_id, content, is_private, reply_to_post_id,
                        allow_replies, media_urls, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(&new_post.author_id)
                .bind(&new_post.content)
                .bind(new_post.is_private)
                .bind(&new_post.reply_to)
                .bind(new_post.allow_replies)
                .bind(&media_urls)
                .bind(now)
                .bind(now)
                .execute(&mut *conn)
                .await?;

                Ok(parent_owner)
            })
            .await;
        let parent_owner = tx.finish(result).await?;
        Ok((id, parent_owner))
    }

    /// Replace a post's content; only the owner may do so
    pub async fn update_post_content(
        &self,
        post_id: &EntityId,
        caller: &EntityId,
        content: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;
        let result = self
            .bounded(async {
                let conn = tx.conn()?;
                let post = live_post(&mut *conn, post_id, caller)
                    .await?
                    .ok_or(AppError::NotFound)?;
                if &post.user_id != caller {
                    return Err(AppError::Unauthorized);
                }

                sqlx::query("UPDATE posts SET content = ?, updated_at = ? WHERE id = ?")
                    .bind(content)
                    .bind(Utc::now())
                    .bind(post_id)
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
            .await;
        tx.finish(result).await
    }

    /// Soft-delete a post; only the owner may do so
    ///
    /// Replies and ledger rows are left untouched.
    pub async fn soft_delete_post(
        &self,
        post_id: &EntityId,
        caller: &EntityId,
    ) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;
        let result = self
            .bounded(async {
                let conn = tx.conn()?;
                let post = live_post(&mut *conn, post_id, caller)
                    .await?
                    .ok_or(AppError::NotFound)?;
                if &post.user_id != caller {
                    return Err(AppError::Unauthorized);
                }

                let now = Utc::now();
                sqlx::query("UPDATE posts SET deleted_at = ?, updated_at = ? WHERE id = ?")
                    .bind(now)
                    .bind(now)
                    .bind(post_id)
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
            .await;
        tx.finish(result).await
    }

    // =========================================================================
    // Interaction ledgers
    // =========================================================================

    /// Add `(user, post)` to a ledger and bump its counter atomically
    ///
    /// # Returns
    /// The post owner, for notification fan-out.
    ///
    /// # Errors
    /// - `NotFound` if the post is missing or deleted
    /// - `AlreadyExists` if the row is already present
    pub async fn add_to_ledger(
        &self,
        ledger: Ledger,
        post_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<EntityId, AppError> {
        let mut tx = self.begin_write().await?;
        let result = self
            .bounded(async {
                let conn = tx.conn()?;
                let post = live_post(&mut *conn, post_id, user_id)
                    .await?
                    .ok_or(AppError::NotFound)?;

                let exists: bool = sqlx::query_scalar(&format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = ? AND post_id = ?)",
                    ledger.table()
                ))
                .bind(user_id)
                .bind(post_id)
                .fetch_one(&mut *conn)
                .await?;
                if exists {
                    return Err(AppError::AlreadyExists(format!(
                        "{} already recorded",
                        ledger.noun()
                    )));
                }

                sqlx::query(&format!(
                    "INSERT INTO {} (user_id, post_id, created_at) VALUES (?, ?, ?)",
                    ledger.table()
                ))
                .bind(user_id)
                .bind(post_id)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

                if let Some(counter) = ledger.counter() {
                    sqlx::query(&format!(
                        "UPDATE posts SET {counter} = {counter} + 1 WHERE id = ?"
                    ))
                    .bind(post_id)
                    .execute(&mut *conn)
                    .await?;
                }

                Ok(post.user_id)
            })
            .await;
        tx.finish(result).await
    }

    /// Remove `(user, post)` from a ledger, decrementing its counter only
    /// when a row was actually removed
    ///
    /// # Returns
    /// Whether a row existed.
    pub async fn remove_from_ledger(
        &self,
        ledger: Ledger,
        post_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<bool, AppError> {
        let mut tx = self.begin_write().await?;
        let result = self
            .bounded(async {
                let conn = tx.conn()?;
                let deleted = sqlx::query(&format!(
                    "DELETE FROM {} WHERE user_id = ? AND post_id = ?",
                    ledger.table()
                ))
                .bind(user_id)
                .bind(post_id)
                .execute(&mut *conn)
                .await?
                .rows_affected();

                if deleted > 0 {
                    if let Some(counter) = ledger.counter() {
                        sqlx::query(&format!(
                            "UPDATE posts SET {counter} = {counter} - 1 WHERE id = ? AND {counter} > 0"
                        ))
                        .bind(post_id)
                        .execute(&mut *conn)
                        .await?;
                    }
                }

                Ok(deleted > 0)
            })
            .await;
        tx.finish(result).await
    }

    /// Whether `(user, post)` is in a ledger
    pub async fn ledger_contains(
        &self,
        ledger: Ledger,
        post_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = ? AND post_id = ?)",
            ledger.table()
        ))
        .bind(user_id)
        .bind(post_id)
        .fetch_one(self.pool())
        .await?;
        Ok(exists)
    }

    /// Number of ledger rows for a post
    pub async fn count_ledger(&self, ledger: Ledger, post_id: &EntityId) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE post_id = ?",
            ledger.table()
        ))
        .bind(post_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    // =========================================================================
    // Post reads
    // =========================================================================

    /// Get a visible post as seen by `viewer`
    pub async fn get_post(
        &self,
        post_id: &EntityId,
        viewer: Option<&EntityId>,
    ) -> Result<Option<Post>, AppError> {
        let mut qb = post_select(viewer);
        qb.push(" AND p.id = ");
        qb.push_bind(post_id.clone());

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Post::from))
    }

    /// Timeline of all visible posts, newest first
    pub async fn list_posts(
        &self,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        let mut qb = post_select(viewer);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");
        push_page(&mut qb, page);
        self.fetch_posts(qb).await
    }

    /// Top-level posts of a user, newest first
    pub async fn list_user_posts(
        &self,
        user_id: &EntityId,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        let mut qb = post_select(viewer);
        qb.push(" AND p.reply_to_post_id IS NULL AND p.user_id = ");
        qb.push_bind(user_id.clone());
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");
        push_page(&mut qb, page);
        self.fetch_posts(qb).await
    }

    /// Direct replies to a post, oldest first
    pub async fn list_post_replies(
        &self,
        post_id: &EntityId,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        let mut qb = post_select(viewer);
        qb.push(" AND p.reply_to_post_id = ");
        qb.push_bind(post_id.clone());
        qb.push(" ORDER BY p.created_at ASC, p.id ASC");
        push_page(&mut qb, page);
        self.fetch_posts(qb).await
    }

    /// Replies written by a user, newest first
    pub async fn list_user_replies(
        &self,
        user_id: &EntityId,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        let mut qb = post_select(viewer);
        qb.push(" AND p.reply_to_post_id IS NOT NULL AND p.user_id = ");
        qb.push_bind(user_id.clone());
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");
        push_page(&mut qb, page);
        self.fetch_posts(qb).await
    }

    /// Posts in a user's ledger (liked, bookmarked or reposted), newest first
    pub async fn list_ledger_posts(
        &self,
        ledger: Ledger,
        user_id: &EntityId,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        let mut qb = post_select(viewer);
        qb.push(format!(
            " AND p.id IN (SELECT post_id FROM {} WHERE user_id = ",
            ledger.table()
        ));
        qb.push_bind(user_id.clone());
        qb.push(") ORDER BY p.created_at DESC, p.id DESC");
        push_page(&mut qb, page);
        self.fetch_posts(qb).await
    }

    async fn fetch_posts(&self, mut qb: QueryBuilder<'static, Sqlite>) -> Result<Vec<Post>, AppError> {
        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }
}
