//! Admin menu management. All handlers require an [`OrgAdmin`] session;
//! the organization id always comes from the verified session, never from
//! the request.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use stallfront_core::MenuItemId;

use crate::db::menu::MenuRepository;
use crate::error::AppError;
use crate::middleware::OrgAdmin;
use crate::models::{MenuItem, MenuItemUpdate, NewMenuItem, NewModifier};
use crate::state::AppState;

/// `GET /api/{org}/admin/menu` — every item, hidden ones included.
pub async fn list_items(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
) -> Result<Json<Vec<MenuItem>>, AppError> {
    let items = MenuRepository::new(state.pool())
        .list_all(session.organization_id)
        .await?;
    Ok(Json(items))
}

/// `POST /api/{org}/admin/menu` — create an item with its modifiers.
pub async fn create_item(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
    Json(body): Json<NewMenuItem>,
) -> Result<(StatusCode, Json<MenuItem>), AppError> {
    validate_new_item(&body)?;

    let item = MenuRepository::new(state.pool())
        .create(session.organization_id, &body)
        .await?;

    tracing::info!(
        organization = %session.organization_slug,
        item_id = %item.id,
        "menu item created"
    );

    Ok((StatusCode::CREATED, Json(item)))
}

/// `PATCH /api/{org}/admin/menu/{id}` — field-mask update; a supplied
/// modifier list replaces the existing set atomically.
pub async fn update_item(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
    Path((_org, id)): Path<(String, MenuItemId)>,
    Json(body): Json<MenuItemUpdate>,
) -> Result<Json<MenuItem>, AppError> {
    if let Some(name) = &body.name
        && name.trim().is_empty()
    {
        return Err(AppError::Validation("item name cannot be empty".to_owned()));
    }
    if let Some(price) = body.price
        && price.is_negative()
    {
        return Err(AppError::Validation("price cannot be negative".to_owned()));
    }
    if let Some(modifiers) = &body.modifiers {
        validate_modifiers(modifiers)?;
    }

    let item = MenuRepository::new(state.pool())
        .update(session.organization_id, id, &body)
        .await?;

    Ok(Json(item))
}

/// `DELETE /api/{org}/admin/menu/{id}` — delete an item. Historical order
/// lines keep their snapshots.
pub async fn delete_item(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
    Path((_org, id)): Path<(String, MenuItemId)>,
) -> Result<Json<Value>, AppError> {
    MenuRepository::new(state.pool())
        .delete(session.organization_id, id)
        .await?;

    tracing::info!(
        organization = %session.organization_slug,
        item_id = %id,
        "menu item deleted"
    );

    Ok(Json(json!({ "success": true })))
}

fn validate_new_item(item: &NewMenuItem) -> Result<(), AppError> {
    if item.name.trim().is_empty() {
        return Err(AppError::Validation("item name is required".to_owned()));
    }
    if item.price.is_negative() {
        return Err(AppError::Validation("price cannot be negative".to_owned()));
    }
    validate_modifiers(&item.modifiers)
}

fn validate_modifiers(modifiers: &[NewModifier]) -> Result<(), AppError> {
    for modifier in modifiers {
        if modifier.name.trim().is_empty() {
            return Err(AppError::Validation(
                "modifier name cannot be empty".to_owned(),
            ));
        }
        for option in &modifier.options {
            if option.name.trim().is_empty() {
                return Err(AppError::Validation(
                    "option name cannot be empty".to_owned(),
                ));
            }
        }
    }
    Ok(())
}
