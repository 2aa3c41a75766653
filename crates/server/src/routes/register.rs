//! Organization registration.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub org_name: String,
    pub org_slug: String,
    pub username: String,
    pub password: String,
}

/// `POST /api/register` — create an organization and its owner account.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (_, organization) = AuthService::new(state.pool())
        .register(&body.org_name, &body.org_slug, &body.username, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "organization": {
                "id": organization.id,
                "name": organization.name,
                "slug": organization.slug,
            },
        })),
    ))
}
