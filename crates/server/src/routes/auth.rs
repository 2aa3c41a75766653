//! Authentication endpoints: global and tenant-scoped login, organization
//! switching, session introspection, and logout.

use axum::Json;
use axum::extract::{Path, State};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};

use stallfront_core::Slug;

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::middleware::{CurrentSession, OrgAdmin};
use crate::services::auth::{AuthService, GlobalLogin};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Optional organization slug to complete a multi-org login in one
    /// request.
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOrgRequest {
    pub org_slug: String,
}

/// `POST /api/auth/login` — slug-less login. One membership issues a
/// session immediately; several return the list for selection.
pub async fn global_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let organization = body
        .organization
        .as_deref()
        .map(Slug::normalize)
        .transpose()
        .map_err(|e| AppError::Validation(format!("invalid organization: {e}")))?;

    let outcome = AuthService::new(state.pool())
        .global_login(&body.username, &body.password, organization.as_ref())
        .await?;

    match outcome {
        GlobalLogin::SingleOrganization {
            user, organization, ..
        } => {
            let token = state
                .sessions()
                .issue(user.id, organization.id, &organization.slug)?;
            let jar = jar.add(state.sessions().cookie(token));
            Ok((
                jar,
                Json(json!({ "success": true, "orgSlug": organization.slug })),
            ))
        }
        GlobalLogin::NeedsSelection { memberships, .. } => {
            let orgs: Vec<Value> = memberships
                .iter()
                .map(|(role, org)| {
                    json!({
                        "id": org.id,
                        "slug": org.slug,
                        "name": org.name,
                        "role": role,
                    })
                })
                .collect();
            Ok((
                jar,
                Json(json!({
                    "success": true,
                    "orgs": orgs,
                    "needsOrgSelection": true,
                })),
            ))
        }
    }
}

/// `POST /api/auth/select-org` — switch an authenticated user to another
/// of their organizations. Requires a valid session; the target
/// membership is re-verified before a fresh cookie is issued.
pub async fn select_org(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
    Json(body): Json<SelectOrgRequest>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let slug = Slug::normalize(&body.org_slug)
        .map_err(|e| AppError::Validation(format!("invalid organization: {e}")))?;

    let (organization, _role) = AuthService::new(state.pool())
        .select_organization(session.user_id, &slug)
        .await?;

    let token = state
        .sessions()
        .issue(session.user_id, organization.id, &organization.slug)?;
    let jar = jar.add(state.sessions().cookie(token));

    Ok((
        jar,
        Json(json!({ "success": true, "orgSlug": organization.slug })),
    ))
}

/// `GET /api/auth/orgs` — the current user's memberships.
pub async fn list_orgs(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Value>, AppError> {
    let memberships = AuthService::new(state.pool())
        .memberships(session.user_id)
        .await?;

    let orgs: Vec<Value> = memberships
        .iter()
        .map(|(role, org)| {
            json!({
                "id": org.id,
                "slug": org.slug,
                "name": org.name,
                "role": role,
            })
        })
        .collect();

    Ok(Json(json!({
        "orgs": orgs,
        "currentOrgId": session.organization_id,
    })))
}

/// `POST /api/{org}/auth/login` — tenant-scoped login.
pub async fn org_login(
    State(state): State<AppState>,
    Path(org): Path<String>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    // An unparseable slug can't name an organization; same response as a
    // wrong password.
    let slug = Slug::parse(&org)
        .map_err(|_| AppError::Unauthorized("invalid credentials".to_owned()))?;

    let (user, organization, _role) = AuthService::new(state.pool())
        .org_login(&slug, &body.username, &body.password)
        .await?;

    let token = state
        .sessions()
        .issue(user.id, organization.id, &organization.slug)?;
    let jar = jar.add(state.sessions().cookie(token));

    Ok((jar, Json(json!({ "success": true }))))
}

/// `POST /api/{org}/auth/logout` — clear the session cookie.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    let jar = jar.add(state.sessions().removal_cookie());
    (jar, Json(json!({ "success": true })))
}

/// `GET /api/{org}/auth/me` — user, role, and organization for the
/// current session.
pub async fn me(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
) -> Result<Json<Value>, AppError> {
    let user = UserRepository::new(state.pool())
        .get_by_id(session.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unauthorized".to_owned()))?;

    let (organization, role) = AuthService::new(state.pool())
        .select_organization(session.user_id, &session.organization_slug)
        .await
        .map_err(|_| AppError::Unauthorized("unauthorized".to_owned()))?;

    Ok(Json(json!({
        "id": user.id,
        "username": user.username,
        "role": role,
        "organization": {
            "id": organization.id,
            "name": organization.name,
            "slug": organization.slug,
        },
    })))
}
