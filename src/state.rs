use std::sync::Arc;

use crate::config::Settings;

/// The shared application state.
///
/// Cloned into every request by axum. Both fields are cheap handles: the pool
/// is reference-counted internally and the settings sit behind an `Arc`, so
/// every request reads the same settings value loaded at start-up.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool. Handlers check out one connection each
    /// through [`crate::db::DbSession`].
    pub db: sqlx::SqlitePool,
    /// The application settings, read-only for the lifetime of the process.
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, settings: Settings) -> Self {
        Self { db, settings: Arc::new(settings) }
    }
}
