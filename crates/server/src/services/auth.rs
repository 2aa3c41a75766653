//! Authentication and registration.
//!
//! Passwords are hashed with Argon2id. Login failures all read "invalid
//! credentials": a wrong password, an unknown username, and a username
//! that belongs to no member of the target organization are deliberately
//! indistinguishable.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::StatusCode;
use sqlx::SqlitePool;
use thiserror::Error;

use stallfront_core::{Slug, UserId};

use crate::db::organizations::OrganizationRepository;
use crate::db::users::UserRepository;
use crate::db::RepositoryError;
use crate::models::{Organization, User};

const MAX_NAME_LENGTH: usize = 100;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Errors from the authentication service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed registration or login input.
    #[error("{0}")]
    Validation(String),

    /// Unknown username, wrong password, or no membership in the target
    /// organization.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The organization slug resolves to nothing.
    #[error("organization not found")]
    OrganizationNotFound,

    /// The session's user is not a member of the requested organization.
    #[error("not a member of this organization")]
    NotAMember,

    /// Password hashing or hash parsing failed.
    #[error("password hashing failed")]
    Hashing,

    /// Repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    pub(crate) fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid credentials".to_owned())
            }
            Self::OrganizationNotFound => {
                (StatusCode::NOT_FOUND, "organization not found".to_owned())
            }
            Self::NotAMember => (
                StatusCode::UNAUTHORIZED,
                "not a member of this organization".to_owned(),
            ),
            Self::Hashing => {
                tracing::error!("password hashing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            Self::Repository(err) => match err {
                RepositoryError::NotFound => {
                    (StatusCode::NOT_FOUND, "not found".to_owned())
                }
                RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    tracing::error!(error = %err, "repository error during auth");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_owned(),
                    )
                }
            },
        }
    }
}

/// Outcome of a global (slug-less) login.
#[derive(Debug)]
pub enum GlobalLogin {
    /// Exactly one membership (or an explicit organization was supplied):
    /// a session can be issued immediately.
    SingleOrganization {
        user: User,
        organization: Organization,
        role: String,
    },
    /// Several memberships: the client must pick one and re-submit
    /// credentials with it.
    NeedsSelection {
        user: User,
        memberships: Vec<(String, Organization)>,
    },
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a new organization with its owner account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input and
    /// `AuthError::Repository(Conflict)` when the slug or username is
    /// taken.
    pub async fn register(
        &self,
        organization_name: &str,
        slug_input: &str,
        username: &str,
        password: &str,
    ) -> Result<(User, Organization), AuthError> {
        let organization_name = organization_name.trim();
        if organization_name.is_empty() {
            return Err(AuthError::Validation(
                "organization name is required".to_owned(),
            ));
        }
        if organization_name.len() > MAX_NAME_LENGTH {
            return Err(AuthError::Validation(format!(
                "organization name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }

        let slug = Slug::normalize(slug_input)
            .map_err(|e| AuthError::Validation(format!("invalid slug: {e}")))?;

        let username = username.trim();
        if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
            return Err(AuthError::Validation(format!(
                "username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"
            )));
        }

        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let (user, organization) = OrganizationRepository::new(self.pool)
            .create_with_owner(organization_name, &slug, username, &password_hash)
            .await?;

        tracing::info!(
            organization = %organization.slug,
            user_id = %user.id,
            "registered organization"
        );

        Ok((user, organization))
    }

    /// Tenant-scoped login: credentials are checked against the
    /// organization's membership roster only.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for every failure,
    /// including an unknown slug, so the endpoint discloses nothing about
    /// which organizations exist.
    pub async fn org_login(
        &self,
        slug: &Slug,
        username: &str,
        password: &str,
    ) -> Result<(User, Organization, String), AuthError> {
        let orgs = OrganizationRepository::new(self.pool);

        let organization = orgs
            .find_by_slug(slug)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let (user, password_hash, role) = orgs
            .find_member_by_username(organization.id, username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok((user, organization, role))
    }

    /// Global login. With `organization` supplied (or exactly one
    /// membership) this resolves to a single organization; with several
    /// memberships and no choice it returns the list for selection.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for credential failures,
    /// including a user with no memberships at all, and
    /// `AuthError::NotAMember` when the chosen organization is not among
    /// the user's memberships.
    pub async fn global_login(
        &self,
        username: &str,
        password: &str,
        organization: Option<&Slug>,
    ) -> Result<GlobalLogin, AuthError> {
        let (user, password_hash) = UserRepository::new(self.pool)
            .get_password_hash(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let mut memberships = OrganizationRepository::new(self.pool)
            .memberships_for_user(user.id)
            .await?;

        if let Some(slug) = organization {
            let position = memberships
                .iter()
                .position(|(_, org)| &org.slug == slug)
                .ok_or(AuthError::NotAMember)?;
            let (role, organization) = memberships.swap_remove(position);
            return Ok(GlobalLogin::SingleOrganization {
                user,
                organization,
                role,
            });
        }

        match memberships.len() {
            0 => Err(AuthError::InvalidCredentials),
            1 => {
                let (role, organization) = memberships
                    .pop()
                    .ok_or(AuthError::InvalidCredentials)?;
                Ok(GlobalLogin::SingleOrganization {
                    user,
                    organization,
                    role,
                })
            }
            _ => Ok(GlobalLogin::NeedsSelection { user, memberships }),
        }
    }

    /// Switch an already-authenticated user to another of their
    /// organizations.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::OrganizationNotFound` for an unknown slug and
    /// `AuthError::NotAMember` when the user has no membership there.
    pub async fn select_organization(
        &self,
        user_id: UserId,
        slug: &Slug,
    ) -> Result<(Organization, String), AuthError> {
        let orgs = OrganizationRepository::new(self.pool);

        let organization = orgs
            .find_by_slug(slug)
            .await?
            .ok_or(AuthError::OrganizationNotFound)?;

        let (membership, organization) = orgs
            .find_membership(user_id, organization.id)
            .await?
            .ok_or(AuthError::NotAMember)?;

        Ok((organization, membership.role))
    }

    /// List the organizations the user belongs to, with roles.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn memberships(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(String, Organization)>, AuthError> {
        Ok(OrganizationRepository::new(self.pool)
            .memberships_for_user(user_id)
            .await?)
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::Hashing` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hashing)
}

/// Verify a password against a stored hash. A wrong password is `Ok(false)`;
/// an unparseable stored hash is an error.
///
/// # Errors
///
/// Returns `AuthError::Hashing` if the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::Hashing)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("hunter22").unwrap();
        let b = hash_password("hunter22").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(matches!(
            verify_password("whatever", "not-a-phc-string"),
            Err(AuthError::Hashing)
        ));
    }

    #[test]
    fn test_password_length_bounds() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longer").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }
}
