//! Data models
//!
//! Rust structs representing database rows and the views assembled from them.
//! All models use ULID for IDs and chrono for timestamps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Parse a client-supplied identifier
    ///
    /// # Errors
    /// `InvalidArgument` if `s` is not a ULID
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let ulid = ulid::Ulid::from_string(s.trim())
            .map_err(|_| AppError::InvalidArgument(format!("malformed id: {s}")))?;
        Ok(Self(ulid.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Limit/offset window shared by every listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 50;

    /// Clamp raw client values: limit <= 0 falls back to 10, limit > 50
    /// is capped at 50, negative offsets become 0.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > Self::MAX_LIMIT => Self::MAX_LIMIT,
            Some(l) if l > 0 => l,
            _ => Self::DEFAULT_LIMIT,
        };
        let offset = offset.filter(|o| *o > 0).unwrap_or(0);
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

// =============================================================================
// Users
// =============================================================================

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub is_private: bool,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User with derived relationship counts
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub user: User,
    pub follower_count: i64,
    pub following_count: i64,
}

/// Author/actor fields embedded in other views
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: EntityId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Input for account creation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}

/// Editable profile fields; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub is_private: Option<bool>,
}

/// Stored credential used by login
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredential {
    pub id: EntityId,
    pub password_hash: String,
}

// =============================================================================
// Posts
// =============================================================================

/// Input for post creation
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: EntityId,
    pub content: String,
    pub is_private: bool,
    pub reply_to: Option<EntityId>,
    pub media_urls: Vec<String>,
    pub allow_replies: bool,
}

/// Flat row produced by the shared post SELECT
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: EntityId,
    pub user_id: EntityId,
    pub content: String,
    pub is_private: bool,
    pub reply_to_post_id: Option<EntityId>,
    pub allow_replies: bool,
    pub media_urls: String,
    pub like_count: i64,
    pub repost_count: i64,
    pub reply_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub has_liked: bool,
    pub has_bookmarked: bool,
    pub has_reposted: bool,
}

/// The post view returned by every read path
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: EntityId,
    pub author: UserSummary,
    pub content: String,
    pub is_private: bool,
    pub reply_to_post_id: Option<EntityId>,
    pub allow_replies: bool,
    pub media_urls: Vec<String>,
    pub like_count: i64,
    pub repost_count: i64,
    pub reply_count: i64,
    pub has_liked: bool,
    pub has_bookmarked: bool,
    pub has_reposted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let media_urls = serde_json::from_str(&row.media_urls).unwrap_or_else(|e| {
            tracing::warn!(post_id = %row.id, error = %e, "Unreadable media_urls column");
            Vec::new()
        });

        Post {
            author: UserSummary {
                id: row.user_id,
                username: row.author_username,
                display_name: row.author_display_name,
                avatar_url: row.author_avatar_url,
            },
            id: row.id,
            content: row.content,
            is_private: row.is_private,
            reply_to_post_id: row.reply_to_post_id,
            allow_replies: row.allow_replies,
            media_urls,
            like_count: row.like_count,
            repost_count: row.repost_count,
            reply_count: row.reply_count,
            has_liked: row.has_liked,
            has_bookmarked: row.has_bookmarked,
            has_reposted: row.has_reposted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Follow graph
// =============================================================================

/// Relationship between two users as seen from the first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowStatus {
    pub is_following: bool,
    pub is_accepted: bool,
}

/// Result of a follow request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowOutcome {
    pub is_accepted: bool,
}

/// One entry of a followers/following/pending listing
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FollowEntry {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub user: UserSummary,
    pub is_accepted: bool,
    pub followed_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// Notification types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Like,
    Repost,
    Reply,
    Follow,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Repost => "repost",
            Self::Reply => "reply",
            Self::Follow => "follow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "repost" => Some(Self::Repost),
            "reply" => Some(Self::Reply),
            "follow" => Some(Self::Follow),
            _ => None,
        }
    }
}

/// Input for a stored notification
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: EntityId,
    pub actor_id: EntityId,
    pub post_id: Option<EntityId>,
    pub parent_post_id: Option<EntityId>,
    pub kind: NotificationType,
}

/// Notification row joined with actor and post content
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: EntityId,
    pub user_id: EntityId,
    pub actor_id: EntityId,
    pub post_id: Option<EntityId>,
    pub parent_post_id: Option<EntityId>,
    pub notification_type: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub actor_username: String,
    pub actor_display_name: Option<String>,
    pub actor_avatar_url: Option<String>,
    pub post_content: Option<String>,
    pub parent_post_content: Option<String>,
}

/// Notification as listed to its recipient
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: EntityId,
    pub user_id: EntityId,
    pub actor: UserSummary,
    pub post_id: Option<EntityId>,
    pub parent_post_id: Option<EntityId>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub read: bool,
    pub post_content: Option<String>,
    pub parent_post_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationType::parse(&row.notification_type).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "unknown notification type: {}",
                row.notification_type
            ))
        })?;

        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            actor: UserSummary {
                id: row.actor_id,
                username: row.actor_username,
                display_name: row.actor_display_name,
                avatar_url: row.actor_avatar_url,
            },
            post_id: row.post_id,
            parent_post_id: row.parent_post_id,
            kind,
            read: row.read,
            post_content: row.post_content,
            parent_post_content: row.parent_post_content,
            created_at: row.created_at,
        })
    }
}
