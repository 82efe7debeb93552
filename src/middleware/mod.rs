//! Middleware components for HTTP request processing.
//!
//! The pipeline is assembled by [`apply`] in a fixed order, outermost first:
//!
//! 1. [`error_handling`]: logs failures and renders the JSON error envelope;
//!    also catches panics from every stage below it.
//! 2. [`request_logging`]: logs method, path and client before dispatch, and
//!    status and duration after.
//! 3. CORS for the origins in [`Settings::all_cors_origins`].
//!
//! Each stage observes both the successes and the failures of the stages
//! inside it, because handler errors are ordinary responses by the time they
//! leave the router.

pub mod error_handling;
pub mod ip;
pub mod request_logging;

use axum::{http::HeaderValue, middleware::from_fn, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::Settings;

/// Wraps `router` in the request pipeline.
pub fn apply(router: Router, settings: &Settings) -> Router {
    let router = match cors_layer(settings) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    // axum layers wrap everything added before them: the last one is outermost.
    router
        .layer(from_fn(request_logging::request_logging_middleware))
        .layer(from_fn(error_handling::error_handling_middleware))
}

/// CORS for the configured origins, or `None` if none of them is a valid
/// header value.
///
/// A `*` entry allows any origin. Browsers refuse credentials for a wildcard
/// origin, so that mode leaves `Access-Control-Allow-Credentials` off.
pub fn cors_layer(settings: &Settings) -> Option<CorsLayer> {
    let configured = settings.all_cors_origins();
    if configured.iter().any(|origin| origin == "*") {
        return Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::any())
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request()),
        );
    }

    let origins: Vec<HeaderValue> = configured
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true),
    )
}
