//! HTTP route handlers and router assembly.
//!
//! - `health`: liveness and version endpoints
//!
//! All API routes live under the `/v1` prefix. Unknown paths and unsupported
//! methods answer with the same JSON error envelope as handler errors.

pub mod health;

use axum::{http::StatusCode, routing::get, Router};

use crate::error::ApiError;
use crate::middleware;
use crate::state::AppState;

/// The complete application: versioned routes, fallbacks and the middleware
/// pipeline.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .nest("/v1", v1())
        .fallback(not_found)
        .with_state(state.clone());
    middleware::apply(router, &state.settings)
}

fn v1() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/version", get(health::version))
        .method_not_allowed_fallback(method_not_allowed)
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not Found", "NOT_FOUND")
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed", "METHOD_NOT_ALLOWED")
}
