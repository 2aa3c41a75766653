//! Organization repository: the tenant directory, registration, settings,
//! and membership lookups.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use stallfront_core::{MembershipId, OrganizationId, Slug, UserId};

use super::RepositoryError;
use crate::models::{Membership, Organization, User};

/// Role assigned to the user who registers an organization.
pub const OWNER_ROLE: &str = "owner";

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: OrganizationId,
    slug: Slug,
    name: String,
    checkout_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(r: OrganizationRow) -> Self {
        Self {
            id: r.id,
            slug: r.slug,
            name: r.name,
            checkout_message: r.checkout_message,
            created_at: r.created_at,
        }
    }
}

/// Repository for organization database operations.
pub struct OrganizationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrganizationRepository<'a> {
    /// Create a new organization repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve a slug to its organization. Matching is exact and
    /// case-sensitive; stored slugs are always lowercase.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r"
            SELECT id, slug, name, checkout_message, created_at
            FROM organization
            WHERE slug = ?
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Organization::from))
    }

    /// Get an organization by its id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrganizationId) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r"
            SELECT id, slug, name, checkout_message, created_at
            FROM organization
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Organization::from))
    }

    /// Create a user, an organization, and the owner membership in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username or slug is
    /// already taken; `RepositoryError::Database` for other failures.
    pub async fn create_with_owner(
        &self,
        org_name: &str,
        slug: &Slug,
        username: &str,
        password_hash: &str,
    ) -> Result<(User, Organization), RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let user_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO user (username, password_hash, created_at)
            VALUES (?, ?, ?)
            RETURNING id
            ",
        )
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "username already taken"))?;

        let org_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO organization (slug, name, created_at)
            VALUES (?, ?, ?)
            RETURNING id
            ",
        )
        .bind(slug)
        .bind(org_name)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "slug already taken"))?;

        sqlx::query(
            r"
            INSERT INTO organization_member (user_id, organization_id, role, created_at)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(user_id)
        .bind(org_id)
        .bind(OWNER_ROLE)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let user = User {
            id: UserId::new(user_id),
            username: username.to_owned(),
            created_at: now,
        };
        let organization = Organization {
            id: OrganizationId::new(org_id),
            slug: slug.clone(),
            name: org_name.to_owned(),
            checkout_message: None,
            created_at: now,
        };

        Ok((user, organization))
    }

    /// Update the organization's checkout message, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the organization doesn't
    /// exist; `RepositoryError::Database` for other failures.
    pub async fn update_checkout_message(
        &self,
        id: OrganizationId,
        checkout_message: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE organization
            SET checkout_message = ?
            WHERE id = ?
            ",
        )
        .bind(checkout_message)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(checkout_message.map(str::to_owned))
    }

    /// List the organizations a user belongs to, with their role, ordered
    /// by organization name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn memberships_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(String, Organization)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            role: String,
            id: OrganizationId,
            slug: Slug,
            name: String,
            checkout_message: Option<String>,
            created_at: DateTime<Utc>,
        }

        let rows = sqlx::query_as::<_, Row>(
            r"
            SELECT m.role, o.id, o.slug, o.name, o.checkout_message, o.created_at
            FROM organization_member m
            JOIN organization o ON o.id = m.organization_id
            WHERE m.user_id = ?
            ORDER BY o.name ASC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.role,
                    Organization {
                        id: r.id,
                        slug: r.slug,
                        name: r.name,
                        checkout_message: r.checkout_message,
                        created_at: r.created_at,
                    },
                )
            })
            .collect())
    }

    /// Find a user's membership in a specific organization.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<(Membership, Organization)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            membership_id: MembershipId,
            role: String,
            id: OrganizationId,
            slug: Slug,
            name: String,
            checkout_message: Option<String>,
            created_at: DateTime<Utc>,
        }

        let row = sqlx::query_as::<_, Row>(
            r"
            SELECT m.id AS membership_id, m.role,
                   o.id, o.slug, o.name, o.checkout_message, o.created_at
            FROM organization_member m
            JOIN organization o ON o.id = m.organization_id
            WHERE m.user_id = ? AND m.organization_id = ?
            ",
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| {
            (
                Membership {
                    id: r.membership_id,
                    user_id,
                    organization_id,
                    role: r.role,
                },
                Organization {
                    id: r.id,
                    slug: r.slug,
                    name: r.name,
                    checkout_message: r.checkout_message,
                    created_at: r.created_at,
                },
            )
        }))
    }

    /// Find a member of an organization by username, returning the user,
    /// their password hash, and their role.
    ///
    /// Used by the tenant-scoped login: a username that exists but belongs
    /// to no member of this organization yields `None`, indistinguishable
    /// from an unknown username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_member_by_username(
        &self,
        organization_id: OrganizationId,
        username: &str,
    ) -> Result<Option<(User, String, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            id: UserId,
            username: String,
            password_hash: String,
            created_at: DateTime<Utc>,
            role: String,
        }

        let row = sqlx::query_as::<_, Row>(
            r"
            SELECT u.id, u.username, u.password_hash, u.created_at, m.role
            FROM organization_member m
            JOIN user u ON u.id = m.user_id
            WHERE m.organization_id = ? AND u.username = ?
            ",
        )
        .bind(organization_id)
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
                r.role,
            )
        }))
    }
}

/// Map a unique-constraint violation to `Conflict`, passing other errors
/// through.
fn map_unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}
