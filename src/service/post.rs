//! Post service
//!
//! Handles post operations including create, update, delete, like,
//! bookmark, repost and the post listings.

use std::sync::Arc;

use super::notification::NotificationService;
use crate::data::{Database, EntityId, Ledger, NewPost, NotificationType, Page, Post};
use crate::error::AppError;
use crate::metrics::INTERACTIONS_TOTAL;

/// Input for [`PostService::create_post`]
#[derive(Debug, Clone, Default)]
pub struct CreatePost {
    pub content: String,
    pub is_private: bool,
    pub reply_to: Option<EntityId>,
    pub media_urls: Vec<String>,
    pub allow_replies: bool,
}

fn normalize_content(content: &str) -> Result<String, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::InvalidArgument(
            "content is required".to_string(),
        ));
    }
    Ok(content.to_string())
}

/// Post service
pub struct PostService {
    db: Arc<Database>,
    notifications: Arc<NotificationService>,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>, notifications: Arc<NotificationService>) -> Self {
        Self { db, notifications }
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Create a new post
    ///
    /// # Arguments
    /// * `author_id` - Caller
    /// * `input` - Content, visibility, optional parent, media URLs
    ///
    /// # Returns
    /// Created post, with zero counters
    ///
    /// # Side Effects
    /// - Inserts into database
    /// - For replies, notifies the parent's owner
    pub async fn create_post(&self, author_id: &EntityId, input: CreatePost) -> Result<Post, AppError> {
        let content = normalize_content(&input.content)?;
        let media_urls: Vec<String> = input
            .media_urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .collect();
        if media_urls.iter().any(String::is_empty) {
            return Err(AppError::InvalidArgument(
                "media URLs must not be empty".to_string(),
            ));
        }

        let new_post = NewPost {
            author_id: author_id.clone(),
            content,
            is_private: input.is_private,
            reply_to: input.reply_to,
            media_urls,
            allow_replies: input.allow_replies,
        };
        let (post_id, parent_owner) = self.db.insert_post(&new_post).await?;

        tracing::info!(post_id = %post_id, author_id = %author_id, "Post created");

        if let (Some(parent_owner), Some(parent_id)) = (&parent_owner, &new_post.reply_to) {
            INTERACTIONS_TOTAL.with_label_values(&["reply"]).inc();
            self.notifications
                .notify(
                    parent_owner,
                    author_id,
                    NotificationType::Reply,
                    Some(&post_id),
                    Some(parent_id),
                )
                .await;
        }

        self.get_post(&post_id, Some(author_id)).await
    }

    /// Replace the content of an owned post
    ///
    /// # Errors
    /// - `InvalidArgument` on empty content
    /// - `NotFound` if the post is missing or deleted
    /// - `Unauthorized` if the caller is not the owner
    pub async fn update_post_content(
        &self,
        post_id: &EntityId,
        caller: &EntityId,
        content: &str,
    ) -> Result<Post, AppError> {
        let content = normalize_content(content)?;
        self.db.update_post_content(post_id, caller, &content).await?;
        self.get_post(post_id, Some(caller)).await
    }

    /// Soft-delete an owned post
    pub async fn delete_post(&self, post_id: &EntityId, caller: &EntityId) -> Result<(), AppError> {
        self.db.soft_delete_post(post_id, caller).await?;
        tracing::info!(post_id = %post_id, "Post deleted");
        Ok(())
    }

    // =========================================================================
    // Interactions
    // =========================================================================

    /// Like a post
    ///
    /// # Errors
    /// - `NotFound` if the post is missing or deleted
    /// - `AlreadyExists` if already liked
    ///
    /// # Side Effects
    /// Notifies the post owner after commit
    pub async fn like_post(&self, post_id: &EntityId, user_id: &EntityId) -> Result<(), AppError> {
        self.add_interaction(Ledger::Likes, post_id, user_id, Some(NotificationType::Like))
            .await
    }

    /// Remove a like; no-op if there was none
    pub async fn unlike_post(&self, post_id: &EntityId, user_id: &EntityId) -> Result<(), AppError> {
        if self
            .db
            .remove_from_ledger(Ledger::Likes, post_id, user_id)
            .await?
        {
            INTERACTIONS_TOTAL.with_label_values(&["unlike"]).inc();
        }
        Ok(())
    }

    /// Whether the caller liked a post; anonymous callers never have
    pub async fn has_liked(
        &self,
        post_id: &EntityId,
        user_id: Option<&EntityId>,
    ) -> Result<bool, AppError> {
        match user_id {
            Some(user_id) => self.db.ledger_contains(Ledger::Likes, post_id, user_id).await,
            None => Ok(false),
        }
    }

    /// Bookmark a post
    ///
    /// # Errors
    /// - `NotFound` if the post is missing or deleted
    /// - `AlreadyExists` if already bookmarked
    pub async fn bookmark_post(&self, post_id: &EntityId, user_id: &EntityId) -> Result<(), AppError> {
        self.add_interaction(Ledger::Bookmarks, post_id, user_id, None)
            .await
    }

    /// Remove a bookmark
    ///
    /// # Errors
    /// `NotFound` if the post was not bookmarked
    pub async fn unbookmark_post(
        &self,
        post_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<(), AppError> {
        if !self
            .db
            .remove_from_ledger(Ledger::Bookmarks, post_id, user_id)
            .await?
        {
            return Err(AppError::NotFound);
        }
        INTERACTIONS_TOTAL.with_label_values(&["unbookmark"]).inc();
        Ok(())
    }

    /// Repost a post
    ///
    /// # Errors
    /// - `NotFound` if the post is missing or deleted
    /// - `AlreadyExists` if already reposted
    pub async fn repost_post(&self, post_id: &EntityId, user_id: &EntityId) -> Result<(), AppError> {
        self.add_interaction(Ledger::Reposts, post_id, user_id, Some(NotificationType::Repost))
            .await
    }

    /// Undo a repost; no-op if there was none
    pub async fn unrepost_post(
        &self,
        post_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<(), AppError> {
        if self
            .db
            .remove_from_ledger(Ledger::Reposts, post_id, user_id)
            .await?
        {
            INTERACTIONS_TOTAL.with_label_values(&["unrepost"]).inc();
        }
        Ok(())
    }

    async fn add_interaction(
        &self,
        ledger: Ledger,
        post_id: &EntityId,
        user_id: &EntityId,
        notification: Option<NotificationType>,
    ) -> Result<(), AppError> {
        let owner = self.db.add_to_ledger(ledger, post_id, user_id).await?;
        INTERACTIONS_TOTAL.with_label_values(&[ledger.noun()]).inc();
        tracing::debug!(post_id = %post_id, user_id = %user_id, action = ledger.noun(), "Interaction recorded");

        if let Some(kind) = notification {
            self.notifications
                .notify(&owner, user_id, kind, Some(post_id), None)
                .await;
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a single post as seen by `viewer`
    ///
    /// # Errors
    /// `NotFound` if missing, deleted or not visible to the viewer
    pub async fn get_post(
        &self,
        post_id: &EntityId,
        viewer: Option<&EntityId>,
    ) -> Result<Post, AppError> {
        self.db
            .get_post(post_id, viewer)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Timeline of all visible posts
    pub async fn get_posts(&self, viewer: Option<&EntityId>, page: Page) -> Result<Vec<Post>, AppError> {
        self.db.list_posts(viewer, page).await
    }

    /// Top-level posts of a user
    pub async fn get_user_posts(
        &self,
        user_id: &EntityId,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        self.db.list_user_posts(user_id, viewer, page).await
    }

    /// Top-level posts of a user, looked up by username
    pub async fn get_user_posts_by_username(
        &self,
        username: &str,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        let user_id = self.resolve_username(username).await?;
        self.get_user_posts(&user_id, viewer, page).await
    }

    /// Direct replies to a visible post, oldest first
    pub async fn get_post_replies(
        &self,
        post_id: &EntityId,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        self.get_post(post_id, viewer).await?;
        self.db.list_post_replies(post_id, viewer, page).await
    }

    /// Replies written by a user
    pub async fn get_user_replies(
        &self,
        user_id: &EntityId,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        self.db.list_user_replies(user_id, viewer, page).await
    }

    /// Replies written by a user, looked up by username
    pub async fn get_user_replies_by_username(
        &self,
        username: &str,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        let user_id = self.resolve_username(username).await?;
        self.get_user_replies(&user_id, viewer, page).await
    }

    /// Posts a user liked, looked up by username
    pub async fn get_user_liked_posts_by_username(
        &self,
        username: &str,
        viewer: Option<&EntityId>,
        page: Page,
    ) -> Result<Vec<Post>, AppError> {
        let user_id = self.resolve_username(username).await?;
        self.db
            .list_ledger_posts(Ledger::Likes, &user_id, viewer, page)
            .await
    }

    /// The caller's bookmarks
    pub async fn get_bookmarks(&self, user_id: &EntityId, page: Page) -> Result<Vec<Post>, AppError> {
        self.db
            .list_ledger_posts(Ledger::Bookmarks, user_id, Some(user_id), page)
            .await
    }

    async fn resolve_username(&self, username: &str) -> Result<EntityId, AppError> {
        self.db
            .get_user_by_username(username)
            .await?
            .map(|user| user.id)
            .ok_or(AppError::NotFound)
    }
}
