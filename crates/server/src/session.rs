//! Stateless session tokens.
//!
//! A session is an HS256-signed token carrying the user, the organization
//! it was issued for, and the organization's slug. It lives in an httpOnly
//! cookie and expires after seven days; there is no server-side session
//! store and no revocation list. Signing in to a different organization
//! replaces the token, so a session is only ever valid for one tenant at a
//! time.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stallfront_core::{OrganizationId, Slug, UserId};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Session lifetime.
const SESSION_DAYS: i64 = 7;

/// Errors from session issuance and verification.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The token is missing, malformed, expired, or has a bad signature.
    #[error("invalid session token")]
    Invalid,

    /// Token encoding failed. Indicates a key problem, not bad input.
    #[error("failed to sign session token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Signed token claims. `sub` is the user, `org`/`slug` the tenant the
/// session was issued for.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    org: i64,
    slug: String,
    iat: i64,
    exp: i64,
}

/// A verified session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub organization_slug: Slug,
}

/// Issues and verifies session tokens with a single HS256 key.
pub struct SessionAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    cookie_secure: bool,
}

impl SessionAuthority {
    /// Build an authority from the configured secret.
    #[must_use]
    pub fn new(secret: &SecretString, cookie_secure: bool) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
            cookie_secure,
        }
    }

    /// Sign a seven-day token for a user acting within an organization.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Signing` if encoding fails.
    pub fn issue(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        organization_slug: &Slug,
    ) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.as_i64(),
            org: organization_id.as_i64(),
            slug: organization_slug.as_ref().to_owned(),
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_DAYS)).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SessionError::Signing)
    }

    /// Verify a token and extract its session. Any failure, including an
    /// unparseable slug claim, reads as `Invalid`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Invalid` if the token cannot be trusted.
    pub fn verify(&self, token: &str) -> Result<Session, SessionError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| SessionError::Invalid)?;

        let organization_slug = data
            .claims
            .slug
            .parse::<Slug>()
            .map_err(|_| SessionError::Invalid)?;

        Ok(Session {
            user_id: UserId::new(data.claims.sub),
            organization_id: OrganizationId::new(data.claims.org),
            organization_slug,
        })
    }

    /// Build the session cookie for a freshly issued token.
    #[must_use]
    pub fn cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::days(SESSION_DAYS))
            .build()
    }

    /// Build an expired cookie that clears the session on the client.
    #[must_use]
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::ZERO)
            .build()
    }
}
