//! Account service
//!
//! Profile reads and edits.

use std::sync::Arc;

use crate::data::{Database, EntityId, ProfileUpdate, UserProfile};
use crate::error::AppError;

const MAX_BIO_LENGTH: usize = 500;
const MAX_DISPLAY_NAME_LENGTH: usize = 50;
const MAX_LOCATION_LENGTH: usize = 100;

fn normalize_optional_text(
    value: Option<String>,
    field: &str,
    max_len: usize,
) -> Result<Option<String>, AppError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.chars().count() > max_len {
        return Err(AppError::InvalidArgument(format!(
            "{field} cannot exceed {max_len} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

fn validate_http_url(value: &str, field: &str) -> Result<(), AppError> {
    let parsed = url::Url::parse(value)
        .map_err(|_| AppError::InvalidArgument(format!("{field} must be a valid URL")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::InvalidArgument(format!(
            "{field} must be an http(s) URL"
        )));
    }
    Ok(())
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Profile by ID, with derived follower/following counts
    pub async fn get_profile(&self, user_id: &EntityId) -> Result<UserProfile, AppError> {
        self.db
            .get_user_profile(user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Profile by username
    pub async fn get_profile_by_username(&self, username: &str) -> Result<UserProfile, AppError> {
        self.db
            .get_user_profile_by_username(username)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Update the caller's profile fields
    ///
    /// Empty strings clear a field; omitted fields are left as they are.
    pub async fn update_profile(
        &self,
        user_id: &EntityId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, AppError> {
        let website = normalize_optional_text(update.website, "website", 2048)?;
        if let Some(website) = website.as_deref().filter(|w| !w.is_empty()) {
            validate_http_url(website, "website")?;
        }

        let update = ProfileUpdate {
            display_name: normalize_optional_text(
                update.display_name,
                "display name",
                MAX_DISPLAY_NAME_LENGTH,
            )?,
            bio: normalize_optional_text(update.bio, "bio", MAX_BIO_LENGTH)?,
            location: normalize_optional_text(update.location, "location", MAX_LOCATION_LENGTH)?,
            website,
            is_private: update.is_private,
        };

        if !self.db.update_user_profile(user_id, &update).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(user_id = %user_id, "Profile updated");
        self.get_profile(user_id).await
    }

    /// Point the caller's avatar at an already-uploaded image
    pub async fn update_avatar(
        &self,
        user_id: &EntityId,
        avatar_url: &str,
    ) -> Result<UserProfile, AppError> {
        let avatar_url = avatar_url.trim();
        validate_http_url(avatar_url, "avatar_url")?;

        if !self.db.update_user_avatar(user_id, avatar_url).await? {
            return Err(AppError::NotFound);
        }
        self.get_profile(user_id).await
    }

    /// Record a login; failures are logged, not returned
    pub async fn record_login(&self, user_id: &EntityId) {
        if let Err(error) = self.db.touch_last_login(user_id).await {
            tracing::warn!(user_id = %user_id, error = %error, "Failed to record last login");
        }
    }
}
