//! User repository: login lookups.
//!
//! Registration lives in [`super::organizations`] because it creates the
//! user, the organization, and the owner membership in one transaction.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use stallfront_core::UserId;

use super::RepositoryError;
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    created_at: DateTime<Utc>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, created_at
            FROM user
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| User {
            id: r.id,
            username: r.username,
            created_at: r.created_at,
        }))
    }

    /// Get a user and their password hash by username.
    ///
    /// Returns `None` if the username is unknown.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            id: UserId,
            username: String,
            password_hash: String,
            created_at: DateTime<Utc>,
        }

        let row = sqlx::query_as::<_, Row>(
            r"
            SELECT id, username, password_hash, created_at
            FROM user
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| {
            (
                User {
                    id: r.id,
                    username: r.username,
                    created_at: r.created_at,
                },
                r.password_hash,
            )
        }))
    }
}
