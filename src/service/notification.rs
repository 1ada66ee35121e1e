//! Notification service
//!
//! Producer side (`notify`) is best-effort: a failure to store a
//! notification is logged and counted, never returned to the caller.
//! Consumer side reads and mutates only the caller's own notifications.

use std::sync::Arc;

use crate::data::{Database, EntityId, NewNotification, Notification, NotificationType, Page};
use crate::error::AppError;
use crate::metrics::NOTIFICATION_FAILURES_TOTAL;

/// Notification service
pub struct NotificationService {
    db: Arc<Database>,
}

impl NotificationService {
    /// Create new notification service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a notification
    ///
    /// # Errors
    /// Store failures are returned; use [`NotificationService::notify`] from
    /// interaction flows.
    pub async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<EntityId, AppError> {
        self.db.insert_notification(&notification).await
    }

    /// Fire-and-forget notification for an interaction that already committed
    ///
    /// Skips self-notifications. Never fails.
    pub async fn notify(
        &self,
        recipient_id: &EntityId,
        actor_id: &EntityId,
        kind: NotificationType,
        post_id: Option<&EntityId>,
        parent_post_id: Option<&EntityId>,
    ) {
        if recipient_id == actor_id {
            return;
        }

        let notification = NewNotification {
            recipient_id: recipient_id.clone(),
            actor_id: actor_id.clone(),
            post_id: post_id.cloned(),
            parent_post_id: parent_post_id.cloned(),
            kind,
        };

        if let Err(error) = self.create_notification(notification).await {
            NOTIFICATION_FAILURES_TOTAL
                .with_label_values(&[kind.as_str()])
                .inc();
            tracing::warn!(
                error = %error,
                notification_type = kind.as_str(),
                recipient_id = %recipient_id,
                actor_id = %actor_id,
                "Failed to create notification"
            );
        }
    }

    /// Notifications of the caller, newest first
    pub async fn get_notifications(
        &self,
        user_id: &EntityId,
        page: Page,
    ) -> Result<Vec<Notification>, AppError> {
        self.db.list_notifications(user_id, page).await
    }

    /// Unread count of the caller
    pub async fn get_unread_count(&self, user_id: &EntityId) -> Result<i64, AppError> {
        self.db.count_unread_notifications(user_id).await
    }

    /// Mark one notification read
    ///
    /// # Errors
    /// `NotFound` if it does not exist or belongs to someone else
    pub async fn mark_as_read(
        &self,
        notification_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<(), AppError> {
        if !self.db.mark_notification_read(notification_id, user_id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Mark all of the caller's notifications read
    pub async fn mark_all_as_read(&self, user_id: &EntityId) -> Result<u64, AppError> {
        self.db.mark_all_notifications_read(user_id).await
    }

    /// Delete one notification
    ///
    /// # Errors
    /// `NotFound` if it does not exist or belongs to someone else
    pub async fn delete_notification(
        &self,
        notification_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<(), AppError> {
        if !self.db.soft_delete_notification(notification_id, user_id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
