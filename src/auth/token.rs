//! Access/refresh token issuance and verification
//!
//! Tokens are HS256 JWTs. Nothing is persisted: a token is valid when its
//! signature checks out, its type matches and it has not expired.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::data::EntityId;
use crate::error::AppError;

/// Which half of a pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token so two pairs minted in the same second differ
    pub jti: String,
    pub typ: TokenKind,
}

/// Access + refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Stateless token service
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    leeway: u64,
}

impl TokenService {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration, leeway: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
            leeway,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.token_secret.as_bytes(),
            Duration::seconds(config.access_token_ttl),
            Duration::seconds(config.refresh_token_ttl),
            config.leeway_seconds,
        )
    }

    /// Issue a fresh access/refresh pair for a user
    pub fn issue_pair(&self, user_id: &EntityId) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenKind::Access, self.access_ttl)?,
            refresh_token: self.issue(user_id, TokenKind::Refresh, self.refresh_ttl)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    fn issue(&self, user_id: &EntityId, kind: TokenKind, ttl: Duration) -> Result<String, AppError> {
        // Backdated by a second to tolerate small clock differences.
        let now = Utc::now() - Duration::seconds(1);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: ulid::Ulid::new().to_string(),
            typ: kind,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign token: {e}")))
    }

    /// Verify a token of the expected kind and return its subject
    ///
    /// # Errors
    /// - `ExpiredToken` if past `exp` beyond the leeway
    /// - `InvalidToken` for anything else: bad signature, non-HS256
    ///   algorithm, malformed input, wrong kind, bad subject
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<EntityId, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        validation.leeway = self.leeway;
        validation.set_required_spec_claims(&["exp", "sub", "iat"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => {
                    tracing::debug!(error = %e, "Token rejected");
                    AppError::InvalidToken
                }
            })?;

        if data.claims.typ != expected {
            return Err(AppError::InvalidToken);
        }

        EntityId::parse(&data.claims.sub).map_err(|_| AppError::InvalidToken)
    }
}
