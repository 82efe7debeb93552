//! # scaffold-api
//!
//! Starter backend for JSON HTTP APIs: settings, logging, error handling,
//! database sessions and a generic CRUD layer, wired together so new endpoints
//! only have to add routes and entities.
//!
//! ## Architecture
//!
//! The application is built using:
//! - **Axum**: HTTP server, routing and middleware
//! - **SQLx**: Asynchronous SQLite access through a connection pool
//! - **config / dotenvy**: Layered settings from files and the environment
//! - **tracing**: Structured console logging in plaintext or JSON
//!
//! ## Core Components
//!
//! - [`config`]: Layered, validated, immutable application settings
//! - [`logging`]: Subscriber setup with per-target levels
//! - [`error`]: Application errors and the JSON error envelope
//! - [`db`]: Pool construction, entity marker and request-scoped sessions
//! - [`crud`]: Generic get/list/create/update/remove over any entity
//! - [`middleware`]: Error handling and request logging pipeline
//! - [`routes`]: Router assembly and the health endpoint
//! - [`state`]: Shared application state
//! - [`util`]: Small helpers
//!
//! ## Request flow
//!
//! ```text
//! error handling -> request logging -> CORS -> router -> handler
//!                                                   \-> DbSession -> CrudBase
//! ```

pub mod config;
pub mod crud;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod util;

#[cfg(test)]
mod tests;
