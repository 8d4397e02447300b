//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Db;
use crate::services::Services;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    db: Db,
    services: Services,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, db: Db, services: Services) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                services,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// The shared database handle.
    #[must_use]
    pub fn db(&self) -> &Db {
        &self.inner.db
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.inner.services
    }
}
