//! Session extractors.
//!
//! [`OrgAdmin`] is the authorization gate for tenant-scoped admin routes:
//! it runs before any handler body, verifies the session cookie, and
//! requires the session's organization slug to equal the `org` path
//! parameter. A missing cookie, a bad token, and a cross-tenant session
//! all produce the same 401 so an org mismatch discloses nothing.

use std::collections::HashMap;

use axum::RequestPartsExt;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::error::AppError;
use crate::session::{SESSION_COOKIE, Session};
use crate::state::AppState;

/// A verified session whose organization matches the `org` path
/// parameter. Required by every admin handler.
#[derive(Debug, Clone)]
pub struct OrgAdmin(pub Session);

/// A verified session without a path check, for the non-org-scoped auth
/// endpoints (membership listing, organization switching).
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

fn unauthorized() -> AppError {
    AppError::Unauthorized("unauthorized".to_owned())
}

/// Pull and verify the session cookie from request parts.
async fn session_from_parts(parts: &mut Parts, state: &AppState) -> Result<Session, AppError> {
    let jar = parts
        .extract::<CookieJar>()
        .await
        .map_err(|_| unauthorized())?;

    let cookie = jar.get(SESSION_COOKIE).ok_or_else(unauthorized)?;

    state
        .sessions()
        .verify(cookie.value())
        .map_err(|_| unauthorized())
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state).await?;
        Ok(Self(session))
    }
}

impl FromRequestParts<AppState> for OrgAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state).await?;

        let Path(params) = parts
            .extract::<Path<HashMap<String, String>>>()
            .await
            .map_err(|_| unauthorized())?;

        let org = params.get("org").ok_or_else(unauthorized)?;

        if session.organization_slug.as_ref() != org {
            tracing::debug!(
                path_org = %org,
                session_org = %session.organization_slug,
                "session organization mismatch"
            );
            return Err(unauthorized());
        }

        Ok(Self(session))
    }
}
