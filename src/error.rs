//! Error types for the Librato provider.

use thiserror::Error;

/// Errors that can occur while validating, planning, or applying resources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred, either locally or reported by the API.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A stored resource ID could not be parsed.
    #[error("Invalid resource ID: {0}")]
    InvalidId(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The API answered with a status this provider does not map.
    #[error("Librato API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or summary.
        message: String,
    },

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Returns a reference to the error message for any variant.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::InvalidId(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Http(_err) => "http error (see Debug output)",
            Self::PermissionDenied(msg) => msg,
            Self::ResourceExhausted(msg) => msg,
            Self::Unavailable(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::Api { message, .. } => message,
            Self::Unimplemented(msg) => msg,
        }
    }

    /// Whether this error means the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
