//! SQLite database operations
//!
//! All database access goes through this module and its siblings
//! (`posts`, `follows`, `notifications`), which add `impl Database` blocks.
//! Multi-statement mutations run inside a [`WriteTx`].

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};

use super::models::*;
use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::metrics::TRANSACTIONS_TOTAL;

/// Columns of `users` in [`User`] field order, for an alias of `u`.
pub(super) const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, \
     u.display_name, u.bio, u.avatar_url, u.location, u.website, u.is_private, \
     u.email_verified, u.last_login, u.created_at, u.updated_at";

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
    transaction_timeout: Duration,
}

/// An open `BEGIN IMMEDIATE` transaction on a dedicated pooled connection.
///
/// Finish it with [`WriteTx::finish`]. If it is dropped unfinished (for
/// example because the request was cancelled), the connection is detached
/// from the pool and closed, which discards the transaction.
pub struct WriteTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTx {
    async fn begin(pool: &Pool<Sqlite>) -> Result<Self, AppError> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    /// Connection to run statements on
    pub fn conn(&mut self) -> Result<&mut SqliteConnection, AppError> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("transaction already finished")))
    }

    /// Commit if `result` is `Ok`, roll back otherwise.
    pub async fn finish<T>(mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        let Some(mut conn) = self.conn.take() else {
            return Err(AppError::Internal(anyhow::anyhow!(
                "transaction already finished"
            )));
        };

        match result {
            Ok(value) => match sqlx::query("COMMIT").execute(&mut *conn).await {
                Ok(_) => {
                    TRANSACTIONS_TOTAL.with_label_values(&["committed"]).inc();
                    Ok(value)
                }
                Err(error) => {
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                    TRANSACTIONS_TOTAL.with_label_values(&["failed"]).inc();
                    Err(error.into())
                }
            },
            Err(error) => {
                if let Err(rollback_error) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    tracing::warn!(error = %rollback_error, "Rollback failed; discarding connection");
                    drop(conn.detach());
                }
                TRANSACTIONS_TOTAL.with_label_values(&["rolled_back"]).inc();
                Err(error)
            }
        }
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Write transaction dropped before completion; discarding connection");
            TRANSACTIONS_TOTAL.with_label_values(&["abandoned"]).inc();
            drop(conn.detach());
        }
    }
}

impl Database {
    /// Connect to database and run migrations
    ///
    /// Creates the parent directory and the database file if missing, enables
    /// WAL and foreign keys, and applies `migrations/`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let path = &config.path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let db_path = path.to_str().ok_or_else(|| {
            AppError::Config(format!(
                "database path must be valid UTF-8: {}",
                path.display()
            ))
        })?;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self {
            pool,
            transaction_timeout: Duration::from_millis(config.transaction_timeout_ms),
        })
    }

    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Open a write transaction
    pub async fn begin_write(&self) -> Result<WriteTx, AppError> {
        WriteTx::begin(&self.pool).await
    }

    /// Run a transaction body under the configured deadline
    ///
    /// On timeout the body is dropped and `Internal` is returned, so the
    /// following [`WriteTx::finish`] rolls back.
    pub async fn bounded<T, F>(&self, body: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout(self.transaction_timeout, body).await {
            Ok(result) => result,
            Err(_) => {
                TRANSACTIONS_TOTAL.with_label_values(&["timed_out"]).inc();
                Err(AppError::Internal(anyhow::anyhow!(
                    "transaction exceeded {} ms",
                    self.transaction_timeout.as_millis()
                )))
            }
        }
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user; username and email must be unused
    pub async fn insert_user(&self, new_user: &NewUser) -> Result<User, AppError> {
        let id = EntityId::new();
        let now = Utc::now();

        let mut tx = self.begin_write().await?;
        let result = self
            .bounded(async {
                let conn = tx.conn()?;

                let taken: Option<(String, String)> = sqlx::query_as(
                    "SELECT username, email FROM users WHERE username = ? OR email = ? LIMIT 1",
                )
                .bind(&new_user.username)
                .bind(&new_user.email)
                .fetch_optional(&mut *conn)
                .await?;
                if let Some((username, _)) = taken {
                    let what = if username == new_user.username {
                        "username"
                    } else {
                        "email"
                    };
                    return Err(AppError::Conflict(format!("{what} already taken")));
                }

                sqlx::query(
                    r#"
                    INSERT INTO users (id, username, email, password_hash, display_name, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(&new_user.username)
                .bind(&new_user.email)
                .bind(&new_user.password_hash)
                .bind(&new_user.display_name)
                .bind(now)
                .bind(now)
                .execute(&mut *conn)
                .await
                .map_err(|e| AppError::conflict_on_unique(e, "username or email"))?;

                let user = sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?"
                ))
                .bind(&id)
                .fetch_one(&mut *conn)
                .await?;
                Ok(user)
            })
            .await;
        tx.finish(result).await
    }

    /// Get a live user by ID
    pub async fn get_user(&self, id: &EntityId) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = ? AND u.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Get a live user by username
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.username = ? AND u.deleted_at IS NULL"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Get the password hash for a live username
    pub async fn get_credential_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredential>, AppError> {
        let credential = sqlx::query_as::<_, UserCredential>(
            "SELECT id, password_hash FROM users WHERE username = ? AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credential)
    }

    /// Same as [`Database::get_credential_by_username`], keyed by email
    pub async fn get_credential_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredential>, AppError> {
        let credential = sqlx::query_as::<_, UserCredential>(
            "SELECT id, password_hash FROM users WHERE email = ? AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credential)
    }

    /// Get a user with follower/following counts derived from accepted edges
    pub async fn get_user_profile(&self, id: &EntityId) -> Result<Option<UserProfile>, AppError> {
        self.fetch_profile("u.id = ?", id.as_str()).await
    }

    /// Same as [`Database::get_user_profile`], keyed by username
    pub async fn get_user_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        self.fetch_profile("u.username = ?", username).await
    }

    async fn fetch_profile(
        &self,
        predicate: &str,
        key: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            SELECT {USER_COLUMNS},
                (SELECT COUNT(*) FROM follows f WHERE f.followed_id = u.id AND f.is_accepted = 1) AS follower_count,
                (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id AND f.is_accepted = 1) AS following_count
            FROM users u
            WHERE {predicate} AND u.deleted_at IS NULL
            "#
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    /// Apply the set fields of `update` to a user's profile
    pub async fn update_user_profile(
        &self,
        id: &EntityId,
        update: &ProfileUpdate,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                display_name = COALESCE(?, display_name),
                bio = COALESCE(?, bio),
                location = COALESCE(?, location),
                website = COALESCE(?, website),
                is_private = COALESCE(?, is_private),
                updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&update.display_name)
        .bind(&update.bio)
        .bind(&update.location)
        .bind(&update.website)
        .bind(update.is_private)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace a user's avatar URL
    pub async fn update_user_avatar(
        &self,
        id: &EntityId,
        avatar_url: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET avatar_url = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(avatar_url)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a successful login
    pub async fn touch_last_login(&self, id: &EntityId) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
