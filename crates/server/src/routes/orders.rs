//! Order endpoints: public placement and admin lifecycle management.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use stallfront_core::{OrderId, OrderStatus, Slug};

use crate::db::orders::OrderRepository;
use crate::error::AppError;
use crate::middleware::OrgAdmin;
use crate::models::Order;
use crate::services::orders::{OrderService, PlaceOrder};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    /// Parsed leniently as a string so an unknown value yields a 400
    /// with the row untouched, not a deserialization rejection.
    pub status: String,
}

/// `POST /api/{org}/orders` — public order placement. Priced entirely
/// server-side.
pub async fn place_order(
    State(state): State<AppState>,
    Path(org): Path<String>,
    Json(body): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let slug = Slug::parse(&org)
        .map_err(|_| AppError::NotFound("organization not found".to_owned()))?;

    let order = OrderService::new(state.pool())
        .place_order(&slug, &body)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/{org}/orders` — the staff order queue, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = OrderRepository::new(state.pool())
        .list(session.organization_id)
        .await?;
    Ok(Json(orders))
}

/// `PATCH /api/{org}/orders/{id}/status` — move an order between
/// `RECEIVED`, `PREPARING`, and `READY` in any direction.
pub async fn update_status(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
    Path((_org, id)): Path<(String, OrderId)>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let status: OrderStatus = body
        .status
        .parse()
        .map_err(|e| AppError::Validation(format!("{e}")))?;

    let order = OrderRepository::new(state.pool())
        .set_status(session.organization_id, id, status)
        .await?;

    Ok(Json(order))
}

/// `DELETE /api/{org}/orders` — clear the queue. The order-number
/// counter keeps counting, so numbers never repeat.
pub async fn clear_orders(
    State(state): State<AppState>,
    OrgAdmin(session): OrgAdmin,
) -> Result<Json<Value>, AppError> {
    let deleted = OrderRepository::new(state.pool())
        .clear_all(session.organization_id)
        .await?;

    tracing::info!(
        organization = %session.organization_slug,
        deleted,
        "order queue cleared"
    );

    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
