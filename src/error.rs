//! Error types for the Whisparr provider.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Whisparr answered with an unexpected status or body.
    #[error("Whisparr API error: {0}")]
    Api(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The HTTP request to Whisparr could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

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

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Api(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::Http(_err) => "HTTP error (see Debug output)",
            Self::AlreadyExists(msg) => msg,
            Self::PermissionDenied(msg) => msg,
            Self::ResourceExhausted(msg) => msg,
            Self::Unavailable(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::FailedPrecondition(msg) => msg,
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
        }
    }

    /// Map a non-success Whisparr response to an error.
    ///
    /// `message` is the text extracted from the response body; it is
    /// prefixed with the request description so diagnostics name the call
    /// that failed.
    pub fn from_status(status: StatusCode, context: &str, message: &str) -> Self {
        let detail = if message.is_empty() {
            format!("{} returned {}", context, status)
        } else {
            format!("{} returned {}: {}", context, status, message)
        };

        match status {
            StatusCode::BAD_REQUEST => Self::Validation(detail),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::PermissionDenied(detail),
            StatusCode::NOT_FOUND => Self::NotFound(detail),
            StatusCode::CONFLICT => Self::AlreadyExists(detail),
            StatusCode::TOO_MANY_REQUESTS => Self::ResourceExhausted(detail),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                Self::DeadlineExceeded(detail)
            },
            s if s.is_server_error() => Self::Unavailable(detail),
            _ => Self::Api(detail),
        }
    }

    /// Whether this error means the remote entity no longer exists.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Http(err) => err.status() == Some(StatusCode::NOT_FOUND),
            _ => false,
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Api(msg) => tonic::Status::internal(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Http(err) if err.is_timeout() => {
                tonic::Status::deadline_exceeded(format!("HTTP error: {}", err))
            },
            ProviderError::Http(err) => {
                tonic::Status::unavailable(format!("HTTP error: {}", err))
            },
            ProviderError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::ResourceExhausted(msg) => tonic::Status::resource_exhausted(msg),
            ProviderError::Unavailable(msg) => tonic::Status::unavailable(msg),
            ProviderError::DeadlineExceeded(msg) => tonic::Status::deadline_exceeded(msg),
            ProviderError::FailedPrecondition(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}
