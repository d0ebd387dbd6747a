use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Cannot derive cache key for {producer}: {reason}")]
    KeyDerivation { producer: String, reason: String },
    #[error("Publish failed: {0}")]
    PublishFailed(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error returned by a memoized call.
///
/// `Producer` carries the wrapped function's own error untouched; `Cache`
/// is only produced when the call could not be keyed and warnings were not
/// suppressed. Backend read/write failures never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoError<E> {
    #[error("{0}")]
    Producer(E),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl<E> MemoError<E> {
    /// Returns the producer error, if this is one.
    pub fn into_producer(self) -> Option<E> {
        match self {
            MemoError::Producer(err) => Some(err),
            MemoError::Cache(_) => None,
        }
    }
}
