use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    body::{self, Body},
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use futures::FutureExt;
use uuid::Uuid;

use crate::error::{server_error_response, ErrorBody, Failure, SERVER_ERROR_CODE, SERVER_ERROR_DETAIL};
use crate::logging::ERROR_LOG_TARGET;

/// Outermost stage of the pipeline.
///
/// - A recognized [`crate::error::ApiError`] is logged at warning level and
///   its `{"detail", "code"}` response goes out with the error's status.
/// - Any other [`crate::error::AppError`], and any panic below this layer, is
///   logged at error level with its full context and an error id, and the
///   client gets the generic `500 SERVER_ERROR` body.
///
/// Untagged failure responses that are not JSON, such as extractor
/// rejections or a bare status code, are rewritten into the same envelope.
/// The code is derived from the status (`BAD_REQUEST`,
/// `UNSUPPORTED_MEDIA_TYPE`, ...) and server errors get the generic body.
/// Everything else passes through unchanged.
pub async fn error_handling_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let mut res = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => {
            let error_id = Uuid::new_v4();
            tracing::error!(
                target: ERROR_LOG_TARGET,
                %method,
                %path,
                %error_id,
                panic = %panic_message(panic.as_ref()),
                "Unhandled exception for {}: handler panicked",
                path
            );
            return server_error_response();
        }
    };

    let failure = res.extensions_mut().remove::<Failure>();
    match failure {
        Some(Failure::Handled(err)) => {
            tracing::warn!(
                target: ERROR_LOG_TARGET,
                %method,
                %path,
                status = err.status.as_u16(),
                code = %err.code,
                "Custom error for {}: {}",
                path,
                err.detail
            );
        }
        Some(Failure::Unhandled(err)) => {
            let error_id = Uuid::new_v4();
            tracing::error!(
                target: ERROR_LOG_TARGET,
                %method,
                %path,
                %error_id,
                error = ?err,
                "Unhandled exception for {}: {}",
                path,
                err
            );
        }
        None if needs_envelope(&res) => return render_untagged(res, &method, &path).await,
        None => {}
    }
    res
}

/// Upper bound on how much of a rejection body is read back as the detail.
const MAX_DETAIL_BYTES: usize = 16 * 1024;

fn needs_envelope(res: &Response) -> bool {
    let status = res.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return false;
    }
    let is_json = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let mime = value.split(';').next().unwrap_or_default().trim();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false);
    !is_json
}

async fn render_untagged(res: Response, method: &axum::http::Method, path: &str) -> Response {
    let (mut parts, body) = res.into_parts();
    let status = parts.status;

    let envelope = if status.is_server_error() {
        let error_id = Uuid::new_v4();
        tracing::error!(
            target: ERROR_LOG_TARGET,
            %method,
            %path,
            %error_id,
            status = status.as_u16(),
            "Unhandled exception for {}: untagged {} response",
            path,
            status
        );
        ErrorBody { detail: SERVER_ERROR_DETAIL.to_string(), code: SERVER_ERROR_CODE.to_string() }
    } else {
        let text = body::to_bytes(body, MAX_DETAIL_BYTES)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
            .unwrap_or_default();
        let detail = if text.is_empty() { status.canonical_reason().unwrap_or("Error").to_string() } else { text };
        let code = status_code_name(status);
        tracing::warn!(
            target: ERROR_LOG_TARGET,
            %method,
            %path,
            status = status.as_u16(),
            code = %code,
            "Request rejected for {}: {}",
            path,
            detail
        );
        ErrorBody { detail, code }
    };

    let bytes = match serde_json::to_vec(&envelope) {
        Ok(bytes) => bytes,
        Err(_) => return server_error_response(),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(bytes))
}

/// `UNPROCESSABLE_ENTITY` for 422 and so on. Statuses without a reason
/// phrase become `HTTP_<code>`.
fn status_code_name(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_uppercase() } else { '_' })
            .collect(),
        None => format!("HTTP_{}", status.as_u16()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
