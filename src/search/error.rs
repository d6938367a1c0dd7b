//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// A condition was built with an operator/value combination the query
    /// language cannot express
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// The query as a whole is inconsistent (scope, date range, ...)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The fetch collaborator failed; the message is passed through unchanged
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Errors raised by an [`IssueFetcher`](crate::search::IssueFetcher)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection could not be established or was dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the client timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Credentials were rejected (HTTP 401)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Credentials lack permission (HTTP 403)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Resource does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream rate limit hit (HTTP 429)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// The tracker rejected the query (HTTP 400)
    #[error("Query rejected: {0}")]
    Rejected(String),

    /// Upstream server failure (HTTP 5xx)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Response body could not be interpreted as a list of issues
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Anything else a collaborator wants to report verbatim
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Create an opaque error carrying `message` verbatim
    pub fn other(message: impl Into<String>) -> Self {
        FetchError::Other(message.into())
    }

    /// Whether retrying the same request may succeed: rate limits and
    /// server errors only, timeouts and client errors are final
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::RateLimited(_) | FetchError::Server { .. })
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidCondition(msg) | SearchError::InvalidQuery(msg) => {
                AppError::Validation(msg)
            }
            SearchError::Fetch(err) => err.into(),
        }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network(msg) => AppError::Network(msg),
            FetchError::Timeout(msg) => AppError::Timeout(msg),
            FetchError::Authentication(msg) => AppError::Authentication(msg),
            FetchError::PermissionDenied(msg) => AppError::Authorization(msg),
            FetchError::NotFound(msg) => AppError::NotFound(msg),
            FetchError::RateLimited(_) => AppError::RateLimit,
            FetchError::Rejected(msg) => AppError::Validation(msg),
            other => AppError::Integration {
                integration_source: "youtrack".to_string(),
                message: other.to_string(),
            },
        }
    }
}
