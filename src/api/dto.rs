//! Request and response bodies for the JSON API

use serde::{Deserialize, Serialize};

use crate::auth::TokenPair;
use crate::data::{EntityId, Page, User};
use crate::error::AppError;

/// `?limit=&offset=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<PaginationParams> for Page {
    fn from(params: PaginationParams) -> Self {
        Page::new(params.limit, params.offset)
    }
}

/// Parse an ID taken from the path
pub fn path_id(raw: &str) -> Result<EntityId, AppError> {
    EntityId::parse(raw)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username, or the account's email address
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Body of a successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub reply_to_post_id: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_replies: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct LikedResponse {
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedReadResponse {
    pub updated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_params_are_clamped() {
        let page: Page = PaginationParams {
            limit: Some(1000),
            offset: Some(-5),
        }
        .into();
        assert_eq!(page.limit, 50);
        assert_eq!(page.offset, 0);

        let page: Page = PaginationParams::default().into();
        assert_eq!(page.limit, 10);
    }

    #[test]
    fn create_post_request_defaults() {
        let req: CreatePostRequest = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
        assert!(req.allow_replies);
        assert!(!req.is_private);
        assert!(req.media_urls.is_empty());
        assert!(req.reply_to_post_id.is_none());
    }

    #[test]
    fn path_id_rejects_garbage() {
        assert!(matches!(path_id("not-an-id"), Err(AppError::InvalidArgument(_))));
        let id = EntityId::new();
        assert_eq!(path_id(id.as_str()).unwrap(), id);
    }
}
