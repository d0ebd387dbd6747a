//! Pure functions for mapping repository and memoized-call errors to HTTP
//! status codes.

use crate::cache::{CacheError, MemoError};

use super::RepositoryError;

/// Maps a [`RepositoryError`] to an HTTP status code.
///
/// - `NotFound` -> 404 (Not Found)
/// - `AlreadyExists` -> 409 (Conflict)
/// - `ConnectionFailed` -> 503 (Service Unavailable)
/// - `QueryFailed` -> 500 (Internal Server Error)
/// - `InvalidData` -> 400 (Bad Request)
///
/// # Examples
///
/// ```
/// use evently_core::storage::{RepositoryError, repository_error_to_status_code};
///
/// let error = RepositoryError::NotFound {
///     entity_type: "Event",
///     id: "abc-123".to_string(),
/// };
/// assert_eq!(repository_error_to_status_code(&error), 404);
/// ```
pub fn repository_error_to_status_code(error: &RepositoryError) -> u16 {
    match error {
        RepositoryError::NotFound { .. } => 404,
        RepositoryError::AlreadyExists { .. } => 409,
        RepositoryError::ConnectionFailed(_) => 503,
        RepositoryError::QueryFailed(_) => 500,
        RepositoryError::InvalidData(_) => 400,
    }
}

/// Maps the error of a memoized repository call to an HTTP status code.
///
/// Producer errors map like any repository error. Cache errors only reach
/// callers on key derivation failures, which are programming errors (500).
pub fn memo_error_to_status_code(error: &MemoError<RepositoryError>) -> u16 {
    match error {
        MemoError::Producer(err) => repository_error_to_status_code(err),
        MemoError::Cache(CacheError::ConnectionFailed(_)) => 503,
        MemoError::Cache(_) => 500,
    }
}
