//! Authentication providers
//!
//! The rest of the crate only sees `Arc<dyn AuthProvider>`; which backend
//! sits behind it is decided once, at startup, by [`build_auth_provider`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::credentials::CredentialStore;
use super::password::{hash_password, validate_password, verify_password};
use super::token::{TokenKind, TokenPair, TokenService};
use crate::config::{AuthConfig, AuthProviderKind};
use crate::data::{EntityId, NewUser, User};
use crate::error::AppError;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 30;
const MIN_DISPLAY_NAME_LENGTH: usize = 2;
const MAX_DISPLAY_NAME_LENGTH: usize = 50;

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Registration {
    fn validate(&self) -> Result<(), AppError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(AppError::InvalidArgument("username is required".to_string()));
        }
        let username_len = username.chars().count();
        if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username_len)
            || !username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::InvalidArgument(format!(
                "username must be {MIN_USERNAME_LENGTH}-{MAX_USERNAME_LENGTH} letters, digits or underscores"
            )));
        }

        let email = self.email.trim();
        if email.is_empty() {
            return Err(AppError::InvalidArgument("email is required".to_string()));
        }
        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty()
                    && !domain.contains('@')
                    && domain.split('.').count() >= 2
                    && domain.split('.').all(|label| !label.is_empty()) => {}
            _ => {
                return Err(AppError::InvalidArgument(
                    "email address is malformed".to_string(),
                ));
            }
        }

        if let Some(display_name) = self.display_name.as_deref().map(str::trim) {
            let len = display_name.chars().count();
            if len > 0 && !(MIN_DISPLAY_NAME_LENGTH..=MAX_DISPLAY_NAME_LENGTH).contains(&len) {
                return Err(AppError::InvalidArgument(format!(
                    "display name must be {MIN_DISPLAY_NAME_LENGTH}-{MAX_DISPLAY_NAME_LENGTH} characters"
                )));
            }
        }

        validate_password(&self.password)
    }
}

/// Identity backend
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Create an account
    async fn register(&self, registration: Registration) -> Result<User, AppError>;

    /// Check a username (or email) and password, returning the account id
    async fn authenticate(&self, identifier: &str, password: &str) -> Result<EntityId, AppError>;

    /// Issue a fresh pair for an account that has already proven itself
    fn issue_tokens(&self, user_id: &EntityId) -> Result<TokenPair, AppError>;

    /// Exchange username (or email) and password for a token pair
    async fn login(&self, identifier: &str, password: &str) -> Result<TokenPair, AppError> {
        let user_id = self.authenticate(identifier, password).await?;
        self.issue_tokens(&user_id)
    }

    /// Exchange a refresh token for a new pair
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AppError>;

    /// Verify an access token and return its subject
    async fn verify_token(&self, token: &str) -> Result<EntityId, AppError>;

    /// Verify an access token and load its user
    async fn get_user_from_token(&self, token: &str) -> Result<User, AppError>;
}

// =============================================================================
// Local provider
// =============================================================================

/// Credentials stored in our own database, tokens signed locally
pub struct LocalAuthProvider {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
}

impl LocalAuthProvider {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn register(&self, registration: Registration) -> Result<User, AppError> {
        registration.validate()?;

        let password_hash = hash_password(registration.password).await?;
        let display_name = registration
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let user = self
            .store
            .create_user(NewUser {
                username: registration.username.trim().to_string(),
                email: registration.email.trim().to_ascii_lowercase(),
                password_hash,
                display_name,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    async fn authenticate(&self, identifier: &str, password: &str) -> Result<EntityId, AppError> {
        let identifier = identifier.trim();
        // Usernames cannot contain '@'.
        let credential = if identifier.contains('@') {
            self.store
                .find_credential_by_email(&identifier.to_ascii_lowercase())
                .await?
        } else {
            self.store.find_credential(identifier).await?
        }
        .ok_or(AppError::NotFound)?;

        if !verify_password(password.to_string(), credential.password_hash).await? {
            tracing::info!(user_id = %credential.id, "Login rejected: password mismatch");
            return Err(AppError::InvalidCredential);
        }

        Ok(credential.id)
    }

    fn issue_tokens(&self, user_id: &EntityId) -> Result<TokenPair, AppError> {
        self.tokens.issue_pair(user_id)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let user_id = self.tokens.verify(refresh_token, TokenKind::Refresh)?;
        self.tokens.issue_pair(&user_id)
    }

    async fn verify_token(&self, token: &str) -> Result<EntityId, AppError> {
        self.tokens.verify(token, TokenKind::Access)
    }

    async fn get_user_from_token(&self, token: &str) -> Result<User, AppError> {
        let user_id = self.verify_token(token).await?;
        self.store
            .find_user(&user_id)
            .await?
            .ok_or(AppError::NotFound)
    }
}

// =============================================================================
// Hosted provider
// =============================================================================

#[derive(Debug, Serialize)]
struct IntrospectionRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(default)]
    sub: Option<String>,
}

/// Accounts live in a hosted identity service
///
/// Sign-up, sign-in and refresh happen against that service directly;
/// this side only verifies the access tokens it issued.
pub struct HostedAuthProvider {
    store: Arc<dyn CredentialStore>,
    client: reqwest::Client,
    introspection_url: String,
    api_key: Option<String>,
}

impl HostedAuthProvider {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        introspection_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            store,
            client,
            introspection_url,
            api_key,
        })
    }
}

#[async_trait]
impl AuthProvider for HostedAuthProvider {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn register(&self, _registration: Registration) -> Result<User, AppError> {
        Err(AppError::NotImplemented(
            "registration is handled by the hosted identity service".to_string(),
        ))
    }

    async fn authenticate(&self, _identifier: &str, _password: &str) -> Result<EntityId, AppError> {
        Err(AppError::NotImplemented(
            "login is handled by the hosted identity service".to_string(),
        ))
    }

    fn issue_tokens(&self, _user_id: &EntityId) -> Result<TokenPair, AppError> {
        Err(AppError::NotImplemented(
            "tokens are issued by the hosted identity service".to_string(),
        ))
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenPair, AppError> {
        Err(AppError::NotImplemented(
            "token refresh is handled by the hosted identity service".to_string(),
        ))
    }

    async fn verify_token(&self, token: &str) -> Result<EntityId, AppError> {
        if token.is_empty() {
            return Err(AppError::InvalidToken);
        }

        let mut request = self
            .client
            .post(&self.introspection_url)
            .json(&IntrospectionRequest { token });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Internal(anyhow::anyhow!("introspection endpoint timed out"))
            } else {
                AppError::HttpClient(e)
            }
        })?;
        if !response.status().is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "introspection endpoint returned {}",
                response.status()
            )));
        }

        let body: IntrospectionResponse = response.json().await?;
        if !body.active {
            return Err(AppError::InvalidToken);
        }
        let sub = body.sub.ok_or(AppError::InvalidToken)?;
        EntityId::parse(&sub).map_err(|_| AppError::InvalidToken)
    }

    async fn get_user_from_token(&self, token: &str) -> Result<User, AppError> {
        let user_id = self.verify_token(token).await?;
        self.store
            .find_user(&user_id)
            .await?
            .ok_or(AppError::NotFound)
    }
}

/// Pick the provider named in configuration
pub fn build_auth_provider(
    config: &AuthConfig,
    store: Arc<dyn CredentialStore>,
) -> Result<Arc<dyn AuthProvider>, AppError> {
    let provider: Arc<dyn AuthProvider> = match config.provider {
        AuthProviderKind::Local => Arc::new(LocalAuthProvider::new(
            store,
            TokenService::from_config(config),
        )),
        AuthProviderKind::Hosted => {
            let url = config.hosted.introspection_url.clone().ok_or_else(|| {
                AppError::Config("auth.hosted.introspection_url is required".to_string())
            })?;
            Arc::new(HostedAuthProvider::new(
                store,
                url,
                config.hosted.api_key.clone(),
                Duration::from_millis(config.hosted.timeout_ms),
            )?)
        }
    };

    tracing::info!(provider = provider.name(), "Auth provider selected");
    Ok(provider)
}
