use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use super::ip::client_host;
use crate::logging::REQUEST_LOG_TARGET;

/// Logs every request on the way in and its status and duration on the way
/// out. Neither the request nor the response is touched.
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let client = client_host(&req);
    let started = Instant::now();

    tracing::info!(
        target: REQUEST_LOG_TARGET,
        %method,
        %path,
        %client,
        "Request: {} {} from {}",
        method,
        path,
        client
    );

    let res = next.run(req).await;

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(
        target: REQUEST_LOG_TARGET,
        %method,
        %path,
        status = res.status().as_u16(),
        elapsed_s = elapsed,
        "Response: {} {} Status: {} Took: {:.4}s",
        method,
        path,
        res.status().as_u16(),
        elapsed
    );
    res
}
