//! Credential store seam used by the auth providers

use async_trait::async_trait;

use crate::data::{Database, EntityId, NewUser, User, UserCredential};
use crate::error::AppError;

/// Lookups and inserts the auth providers need from persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stored password hash for a live username
    async fn find_credential(&self, username: &str) -> Result<Option<UserCredential>, AppError>;

    /// Stored password hash for a live, lowercased email address
    async fn find_credential_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredential>, AppError>;

    /// Live user by ID
    async fn find_user(&self, id: &EntityId) -> Result<Option<User>, AppError>;

    /// Insert a new user; `Conflict` if username or email is taken
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError>;
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_credential(&self, username: &str) -> Result<Option<UserCredential>, AppError> {
        self.get_credential_by_username(username).await
    }

    async fn find_credential_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredential>, AppError> {
        self.get_credential_by_email(email).await
    }

    async fn find_user(&self, id: &EntityId) -> Result<Option<User>, AppError> {
        self.get_user(id).await
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        self.insert_user(&new_user).await
    }
}
