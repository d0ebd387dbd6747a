use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use evently_core::cache::MemoError;
use evently_core::storage::{
    memo_error_to_status_code, repository_error_to_status_code, RepositoryError,
};

/// Errors raised while reading the caller's identity from a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Missing x-user-id header")]
    Missing,
    #[error("Invalid x-user-id header: {0}")]
    Invalid(String),
}

/// Application error type that wraps `anyhow::Error`.
///
/// This allows using `?` on functions that return `Result<_, anyhow::Error>`
/// to automatically convert them into `Result<_, AppError>`. Known error
/// types are mapped to their status code, anything else is a 500.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        let code = if let Some(err) = self.0.downcast_ref::<RepositoryError>() {
            repository_error_to_status_code(err)
        } else if let Some(err) = self.0.downcast_ref::<MemoError<RepositoryError>>() {
            memo_error_to_status_code(err)
        } else if self.0.downcast_ref::<IdentityError>().is_some() {
            401
        } else {
            500
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(error = %self.0, "Application error");
        }

        (status_code, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
