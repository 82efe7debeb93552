//! Unit and integration tests for the application.
//!
//! ## Test Modules
//!
//! - **config_tests**: Settings layering, coercion and validation
//! - **error_tests**: Application errors and their responses
//! - **crud_tests**: Generic CRUD base against an in-memory SQLite table
//! - **db_tests**: Pool construction and request-scoped sessions
//! - **middleware_tests**: Error handling and request logging pipeline
//! - **health_api_tests**: Health, version and fallback routes
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test
//! cargo test config_tests
//! ```

pub mod config_tests;

use std::collections::HashMap;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::config::{Settings, SettingsLoader};

/// A loader isolated from the working directory and the process environment.
pub(crate) fn isolated_loader(env: &[(&str, &str)]) -> SettingsLoader {
    let vars: HashMap<String, String> = env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    SettingsLoader::new().without_dotenv().without_metadata().environment(vars)
}

pub(crate) fn test_settings() -> Settings {
    isolated_loader(&[("DATABASE_URL", "sqlite::memory:")]).load().unwrap()
}

/// Single-connection in-memory pool; every checkout sees the same database.
pub(crate) async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(2))
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

pub(crate) fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub(crate) async fn body_json(res: Response) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
