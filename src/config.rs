//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Pool size
    pub max_connections: u32,
    /// How long a writer waits for the database lock
    pub busy_timeout_ms: u64,
    /// Upper bound for a single write transaction
    pub transaction_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Defaults for a database at `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 8,
            busy_timeout_ms: 5_000,
            transaction_timeout_ms: 10_000,
        }
    }
}

/// Which identity backend verifies credentials
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    #[default]
    Local,
    Hosted,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Identity backend
    #[serde(default)]
    pub provider: AuthProviderKind,
    /// HMAC secret for signing tokens (32+ bytes)
    pub token_secret: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes)
    pub access_token_ttl: i64,
    /// Refresh token lifetime in seconds (default: 604800 = 7 days)
    pub refresh_token_ttl: i64,
    /// Clock skew tolerated when checking expiry
    pub leeway_seconds: u64,
    #[serde(default)]
    pub hosted: HostedAuthConfig,
}

/// Hosted identity service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HostedAuthConfig {
    /// Token introspection endpoint
    pub introspection_url: Option<String>,
    /// API key sent as bearer credential to the endpoint
    pub api_key: Option<String>,
    /// Upper bound on a single introspection call (default: 10000)
    #[serde(default = "default_hosted_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_hosted_timeout_ms() -> u64 {
    10_000
}

impl Default for HostedAuthConfig {
    fn default() -> Self {
        Self {
            introspection_url: None,
            api_key: None,
            timeout_ms: default_hosted_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (HORIZON__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/horizon.db")?
            .set_default("database.max_connections", 8)?
            .set_default("database.busy_timeout_ms", 5000)?
            .set_default("database.transaction_timeout_ms", 10000)?
            .set_default("auth.provider", "local")?
            .set_default("auth.access_token_ttl", 900)?
            .set_default("auth.refresh_token_ttl", 604800)?
            .set_default("auth.leeway_seconds", 2)?
            .set_default("auth.hosted.timeout_ms", 10000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("HORIZON")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_TOKEN_SECRET_BYTES: usize = 32;

        if self.auth.token_secret.as_bytes().len() < MIN_TOKEN_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.token_secret must be at least {} bytes",
                MIN_TOKEN_SECRET_BYTES
            )));
        }

        if self.auth.access_token_ttl <= 0 || self.auth.refresh_token_ttl <= 0 {
            return Err(crate::error::AppError::Config(
                "auth token lifetimes must be greater than 0".to_string(),
            ));
        }

        if self.database.transaction_timeout_ms == 0 {
            return Err(crate::error::AppError::Config(
                "database.transaction_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.auth.provider == AuthProviderKind::Hosted {
            let endpoint = self.auth.hosted.introspection_url.as_deref().ok_or_else(|| {
                crate::error::AppError::Config(
                    "auth.hosted.introspection_url is required for the hosted provider"
                        .to_string(),
                )
            })?;
            url::Url::parse(endpoint).map_err(|e| {
                crate::error::AppError::Config(format!(
                    "auth.hosted.introspection_url is not a valid URL: {e}"
                ))
            })?;
            if self.auth.hosted.timeout_ms == 0 {
                return Err(crate::error::AppError::Config(
                    "auth.hosted.timeout_ms must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}
