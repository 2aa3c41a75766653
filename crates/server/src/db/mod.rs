//! Database operations for the `SQLite` store.
//!
//! # Tables
//!
//! - `organization` - Tenants, with the per-organization order-number counter
//! - `user` / `organization_member` - Staff accounts and their memberships
//! - `menu_item` / `modifier` / `modifier_option` - The catalog
//! - `orders` / `order_item` / `order_item_modifier` - Immutable order records
//!
//! # Scoping
//!
//! Every catalog and order repository method takes an [`OrganizationId`]
//! as its first parameter, sourced from a verified session or a resolved
//! slug — never from client-supplied ids. A row belonging to another
//! organization is indistinguishable from a missing row
//! ([`RepositoryError::NotFound`] either way).
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are embedded via
//! [`MIGRATOR`]; the server runs them at startup.
//!
//! [`OrganizationId`]: stallfront_core::OrganizationId

pub mod menu;
pub mod organizations;
pub mod orders;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

/// Embedded migrations for the server database.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors from the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The row does not exist — or belongs to another organization, which
    /// callers must not be able to distinguish.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value failed to parse back into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// WAL journaling and a busy timeout let concurrent writers queue on the
/// single-writer lock instead of failing.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}
