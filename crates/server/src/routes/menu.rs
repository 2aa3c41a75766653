//! Public menu endpoint. No credential; the slug is the only scope.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use stallfront_core::Slug;

use crate::db::menu::MenuRepository;
use crate::db::organizations::OrganizationRepository;
use crate::error::AppError;
use crate::state::AppState;

/// `GET /api/{org}/menu` — the organization's available items with nested
/// modifiers, plus the vendor's display name and checkout message.
pub async fn public_menu(
    State(state): State<AppState>,
    Path(org): Path<String>,
) -> Result<Json<Value>, AppError> {
    let slug = Slug::parse(&org)
        .map_err(|_| AppError::NotFound("organization not found".to_owned()))?;

    let organization = OrganizationRepository::new(state.pool())
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("organization not found".to_owned()))?;

    let menu_items = MenuRepository::new(state.pool())
        .list_available(organization.id)
        .await?;

    Ok(Json(json!({
        "organization": {
            "name": organization.name,
            "checkoutMessage": organization.checkout_message,
        },
        "menuItems": menu_items,
    })))
}
