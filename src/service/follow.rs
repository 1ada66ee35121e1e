//! Follow service
//!
//! Follow edge lifecycle: absent -> pending -> accepted, and back to absent
//! through unfollow or rejection.

use std::sync::Arc;

use super::notification::NotificationService;
use crate::data::{Database, EntityId, FollowEntry, FollowOutcome, FollowStatus, NotificationType, Page};
use crate::error::AppError;
use crate::metrics::INTERACTIONS_TOTAL;

/// Follow service
pub struct FollowService {
    db: Arc<Database>,
    notifications: Arc<NotificationService>,
}

impl FollowService {
    /// Create new follow service
    pub fn new(db: Arc<Database>, notifications: Arc<NotificationService>) -> Self {
        Self { db, notifications }
    }

    /// Follow a user
    ///
    /// Public accounts are followed immediately, private accounts get a
    /// pending request.
    ///
    /// # Errors
    /// - `InvalidArgument` if `follower_id == followed_id`
    /// - `NotFound` if the followed user does not exist
    /// - `AlreadyExists` if an edge already exists
    ///
    /// # Side Effects
    /// Notifies the followed user after commit
    pub async fn follow_user(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<FollowOutcome, AppError> {
        if follower_id == followed_id {
            return Err(AppError::InvalidArgument(
                "cannot follow yourself".to_string(),
            ));
        }

        let is_accepted = self.db.insert_follow(follower_id, followed_id).await?;
        INTERACTIONS_TOTAL.with_label_values(&["follow"]).inc();
        tracing::info!(
            follower_id = %follower_id,
            followed_id = %followed_id,
            is_accepted,
            "Follow edge created"
        );

        self.notifications
            .notify(followed_id, follower_id, NotificationType::Follow, None, None)
            .await;

        Ok(FollowOutcome { is_accepted })
    }

    /// Remove a follow edge in either state
    ///
    /// # Errors
    /// `NotFound` if there was no edge
    pub async fn unfollow_user(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<(), AppError> {
        if !self.db.delete_follow(follower_id, followed_id).await? {
            return Err(AppError::NotFound);
        }
        INTERACTIONS_TOTAL.with_label_values(&["unfollow"]).inc();
        Ok(())
    }

    /// Accept a request sent to the caller
    ///
    /// # Arguments
    /// * `follower_id` - Who asked
    /// * `followed_id` - The caller
    ///
    /// # Errors
    /// `NotFound` if there is no edge; accepting twice is a no-op
    pub async fn accept_follow_request(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<(), AppError> {
        self.db.accept_follow(follower_id, followed_id).await
    }

    /// Reject a pending request sent to the caller
    ///
    /// # Errors
    /// `NotFound` if there is no pending edge
    pub async fn reject_follow_request(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<(), AppError> {
        if !self.db.reject_follow(follower_id, followed_id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Relationship from `follower_id` to `followed_id`
    pub async fn get_follow_status(
        &self,
        follower_id: &EntityId,
        followed_id: &EntityId,
    ) -> Result<FollowStatus, AppError> {
        if follower_id == followed_id {
            return Ok(FollowStatus {
                is_following: false,
                is_accepted: false,
            });
        }

        let edge = self.db.get_follow_edge(follower_id, followed_id).await?;
        Ok(FollowStatus {
            is_following: edge.is_some(),
            is_accepted: edge.unwrap_or(false),
        })
    }

    /// Accepted followers of a user
    pub async fn get_followers(&self, user_id: &EntityId, page: Page) -> Result<Vec<FollowEntry>, AppError> {
        self.db.list_followers(user_id, page).await
    }

    /// Accounts a user follows
    pub async fn get_following(&self, user_id: &EntityId, page: Page) -> Result<Vec<FollowEntry>, AppError> {
        self.db.list_following(user_id, page).await
    }

    /// Pending requests addressed to the caller
    pub async fn get_pending_follow_requests(
        &self,
        user_id: &EntityId,
        page: Page,
    ) -> Result<Vec<FollowEntry>, AppError> {
        self.db.list_pending_follow_requests(user_id, page).await
    }
}
