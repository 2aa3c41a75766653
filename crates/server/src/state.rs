//! Shared application state.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::ServerConfig;
use crate::images::ImageStore;
use crate::session::SessionAuthority;

/// Application state shared across all request handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: SqlitePool,
    sessions: SessionAuthority,
    images: Arc<dyn ImageStore>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: ServerConfig,
        pool: SqlitePool,
        sessions: SessionAuthority,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                sessions,
                images,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionAuthority {
        &self.inner.sessions
    }

    #[must_use]
    pub fn images(&self) -> &dyn ImageStore {
        self.inner.images.as_ref()
    }
}
