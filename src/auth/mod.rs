//! Authentication
//!
//! Handles:
//! - Password hashing
//! - Access/refresh token issuance and verification
//! - Pluggable identity providers (local database or hosted service)
//! - Request extractors

mod credentials;
mod middleware;
pub mod password;
mod provider;
pub mod token;

pub use credentials::CredentialStore;
pub use middleware::{CurrentUser, MaybeUser, bearer_token};
pub use provider::{
    AuthProvider, HostedAuthProvider, LocalAuthProvider, Registration, build_auth_provider,
};
pub use token::{TokenKind, TokenPair, TokenService};
