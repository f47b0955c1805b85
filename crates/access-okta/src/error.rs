//! Error types for the identity directory client.

use thiserror::Error;

/// Result type alias using `DirectoryError`.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors returned by a [`DirectoryClient`](crate::DirectoryClient).
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The requested group or user does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// What was looked up, e.g. `group 00g1abc`
        resource: String,
    },

    /// An email lookup matched more than one user.
    #[error("email {email} matches {matches} users")]
    Ambiguous {
        /// The email that was looked up
        email: String,
        /// Number of matching users
        matches: usize,
    },

    /// The directory rejected the request as conflicting with current state.
    #[error("conflict: {message}")]
    Conflict {
        /// Error summary from the directory
        message: String,
    },

    /// The directory rejected the request body or parameters.
    #[error("validation failed: {message}")]
    Validation {
        /// Error summary from the directory
        message: String,
    },

    /// Any other non-success response.
    #[error("directory API error {status} ({code}): {summary}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Directory error code (e.g. `E0000006`)
        code: String,
        /// Directory error summary
        summary: String,
    },

    /// Transport failure: connect, TLS, timeout or body read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A list response could not be followed to its end: the next-page link
    /// left the org or the page limit was reached.
    #[error("pagination error: {0}")]
    Pagination(String),

    /// Client configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DirectoryError {
    /// Create a not-found error for `resource`
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Whether the error means the looked-up object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether retrying the same request later may succeed.
    ///
    /// Transport failures, conflicts, throttling and server errors are
    /// transient. Everything else needs a configuration or data change.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Conflict { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound { .. }
            | Self::Ambiguous { .. }
            | Self::Validation { .. }
            | Self::Json(_)
            | Self::Pagination(_)
            | Self::Config(_) => false,
        }
    }
}
