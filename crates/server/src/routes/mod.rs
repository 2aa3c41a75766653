//! HTTP route definitions.
//!
//! Public routes (menu, order placement) are scoped by the `{org}` slug
//! alone; admin routes additionally require an [`OrgAdmin`] session whose
//! organization matches the slug.
//!
//! [`OrgAdmin`]: crate::middleware::OrgAdmin

pub mod admin_menu;
pub mod auth;
pub mod menu;
pub mod orders;
pub mod register;
pub mod settings;
pub mod upload;

use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::error::AppError;
use crate::state::AppState;

/// Build the application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .route("/api/register", post(register::register))
        .route("/api/auth/login", post(auth::global_login))
        .route("/api/auth/select-org", post(auth::select_org))
        .route("/api/auth/orgs", get(auth::list_orgs))
        .route("/api/{org}/menu", get(menu::public_menu))
        .route(
            "/api/{org}/orders",
            post(orders::place_order)
                .get(orders::list_orders)
                .delete(orders::clear_orders),
        )
        .route("/api/{org}/orders/{id}/status", patch(orders::update_status))
        .route(
            "/api/{org}/admin/menu",
            get(admin_menu::list_items).post(admin_menu::create_item),
        )
        .route(
            "/api/{org}/admin/menu/{id}",
            patch(admin_menu::update_item).delete(admin_menu::delete_item),
        )
        .route(
            "/api/{org}/admin/settings",
            get(settings::get_settings).patch(settings::update_settings),
        )
        .route("/api/{org}/admin/upload", post(upload::upload_image))
        .route("/api/{org}/auth/login", post(auth::org_login))
        .route("/api/{org}/auth/logout", post(auth::logout))
        .route("/api/{org}/auth/me", get(auth::me))
}

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness probe: verifies a database round-trip.
async fn ready(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(state.pool())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "readiness check failed");
            AppError::Internal("database unavailable".to_owned())
        })?;

    Ok(Json(json!({ "status": "ready" })))
}
