use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Machine code sent for every failure that is not a recognized [`ApiError`].
pub const SERVER_ERROR_CODE: &str = "SERVER_ERROR";
/// Detail sent for every failure that is not a recognized [`ApiError`].
pub const SERVER_ERROR_DETAIL: &str = "An unexpected error occurred. Please try again later.";

/// The JSON envelope every failure is rendered as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    pub code: String,
}

/// A deliberately raised failure with a fixed HTTP status and machine code.
///
/// Domain code builds one of these when it recognizes a failure condition
/// (missing entity, bad credentials, missing permission). The error handling
/// middleware logs it at warning level and the client receives the status,
/// the detail and the code unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail} ({code})")]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
    pub code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>, code: impl Into<String>) -> Self {
        Self { status, detail: detail.into(), code: code.into() }
    }

    /// An application error without a dedicated code.
    pub fn generic(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::new(status, detail, "GENERIC_ERROR")
    }

    pub fn user_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "User not found.", "USER_NOT_FOUND")
    }

    pub fn invalid_credentials() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Invalid authentication credentials.", "INVALID_CREDENTIALS")
    }

    pub fn not_permitted() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action.",
            "NOT_PERMITTED",
        )
    }

    /// Replaces the human-readable detail, keeping status and code.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { detail: self.detail.clone(), code: self.code.clone() }
    }
}

/// The primary error type for request handlers.
///
/// Only [`AppError::Api`] reaches the client as-is. Everything else is logged
/// with its full context by the error handling middleware and collapsed into a
/// generic `500 SERVER_ERROR` response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Marker attached to error responses so the error handling middleware can
/// log the original failure. Removed again before the response leaves.
#[derive(Debug, Clone)]
pub(crate) enum Failure {
    Handled(ApiError),
    Unhandled(Arc<AppError>),
}

pub(crate) fn server_error_response() -> Response {
    let body = ErrorBody { detail: SERVER_ERROR_DETAIL.to_string(), code: SERVER_ERROR_CODE.to_string() };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut res = (self.status, Json(self.body())).into_response();
        res.extensions_mut().insert(Failure::Handled(self));
        res
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Api(err) => err.into_response(),
            other => {
                let mut res = server_error_response();
                res.extensions_mut().insert(Failure::Unhandled(Arc::new(other)));
                res
            }
        }
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// Converts a missing value into a recognized application error.
///
/// ```
/// use scaffold_api::error::{ApiError, OptionExt};
///
/// let user: Option<u32> = None;
/// let err = user.ok_or_api(ApiError::user_not_found()).unwrap_err();
/// assert_eq!(err.code, "USER_NOT_FOUND");
/// ```
pub trait OptionExt<T> {
    fn ok_or_api(self, err: ApiError) -> Result<T, ApiError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_api(self, err: ApiError) -> Result<T, ApiError> {
        self.ok_or(err)
    }
}
