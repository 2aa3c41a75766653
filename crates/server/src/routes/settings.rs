//! Organization settings: the checkout message shown to customers.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::db::organizations::OrganizationRepository;
use crate::error::AppError;
use crate::middleware::OrgAdmin;
use crate::state::AppState;

const MAX_CHECKOUT_MESSAGE_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    /// `null` (or absent) clears the message.
    #[serde(default)]
    pub checkout_message: Option<String>,
}

/// `GET /api/{org}/admin/settings`.
pub async fn get_settings(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
) -> Result<Json<Value>, AppError> {
    let organization = OrganizationRepository::new(state.pool())
        .get(session.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("organization not found".to_owned()))?;

    Ok(Json(
        json!({ "checkoutMessage": organization.checkout_message }),
    ))
}

/// `PATCH /api/{org}/admin/settings`.
pub async fn update_settings(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<Value>, AppError> {
    if let Some(message) = &body.checkout_message
        && message.len() > MAX_CHECKOUT_MESSAGE_LENGTH
    {
        return Err(AppError::Validation(format!(
            "checkout message must be at most {MAX_CHECKOUT_MESSAGE_LENGTH} characters"
        )));
    }

    let message = OrganizationRepository::new(state.pool())
        .update_checkout_message(session.organization_id, body.checkout_message.as_deref())
        .await?;

    Ok(Json(json!({ "checkoutMessage": message })))
}
