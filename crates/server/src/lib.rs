//! Multi-tenant point-of-sale backend for popup vendors.
//!
//! Each organization gets a slug-addressed public menu and order
//! endpoint, plus a cookie-authenticated admin surface for managing the
//! catalog and working the order queue. Tenancy is enforced twice: the
//! [`middleware::OrgAdmin`] gate matches the session against the `{org}`
//! path parameter, and every repository query filters on the
//! organization id.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::images::LocalImageStore;
use crate::session::SessionAuthority;
use crate::state::AppState;

/// Build application state from configuration and an open pool.
#[must_use]
pub fn build_state(config: ServerConfig, pool: sqlx::SqlitePool) -> AppState {
    let sessions = SessionAuthority::new(&config.auth_secret, config.cookie_secure);
    let images = Arc::new(LocalImageStore::new(
        config.upload_dir.clone(),
        &config.base_url,
    ));
    AppState::new(config, pool, sessions, images)
}

/// Build the full application: API routes, uploaded-image serving, and
/// request tracing.
#[must_use]
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config().upload_dir);

    routes::router()
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
