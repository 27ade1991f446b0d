//! Backend error type.

use thiserror::Error;

/// Boxed error used at the seams where callers supply their own logic
/// (answer parsers, validators, closure tools).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from language model backends.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network or transport failure.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The backend rate-limited the request.
    #[error("rate limited")]
    RateLimited,

    /// Authentication/authorization failed.
    #[error("auth failed: {0}")]
    AuthFailed(String),

    /// The backend replied with something that could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] BoxError),
}

impl BackendError {
    /// Whether retrying the request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::RateLimited | BackendError::RequestFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        assert_eq!(
            BackendError::RequestFailed("timeout".into()).to_string(),
            "request failed: timeout"
        );
        assert_eq!(BackendError::RateLimited.to_string(), "rate limited");
        assert_eq!(
            BackendError::InvalidResponse("empty".into()).to_string(),
            "invalid response: empty"
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(BackendError::RateLimited.is_retryable());
        assert!(BackendError::RequestFailed("reset".into()).is_retryable());
        assert!(!BackendError::AuthFailed("bad key".into()).is_retryable());
        assert!(!BackendError::InvalidResponse("x".into()).is_retryable());
    }
}
