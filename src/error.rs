use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt::Display;

use crate::response::ApiResponse;

/// Error type for admin API handlers.
///
/// Only two classes reach the caller: bad input or an unmet precondition
/// (400), and a failed dependency (500). Both carry the message verbatim.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Upstream(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Wrap a dependency failure as `"<stage>: <detail>"`, keeping the whole
    /// cause chain in the detail.
    pub fn upstream(stage: &str, err: impl Display) -> Self {
        AppError::Upstream(format!("{stage}: {err:#}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Validation(msg) => {
                tracing::warn!(error = %msg, "Rejected request");
                msg
            }
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream failure");
                msg
            }
        };

        (status, ApiResponse::<()>::error(message)).into_response()
    }
}
