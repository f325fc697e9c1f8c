//! Error types for the controller.
//!
//! Defines custom error types with classification for retry behavior.

use std::time::Duration;
use thiserror::Error;

use crate::client::ApiError;

/// What went wrong while resolving credentials.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CredentialErrorCause {
    /// The ProviderConfig, Secret, key, variable or file does not exist.
    NotFound,
    /// The payload exists but is not a valid credentials document.
    Decode,
}

impl std::fmt::Display for CredentialErrorCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialErrorCause::NotFound => write!(f, "not found"),
            CredentialErrorCause::Decode => write!(f, "cannot decode"),
        }
    }
}

/// Credentials could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot get credentials ({cause}): {message}")]
pub struct CredentialError {
    pub cause: CredentialErrorCause,
    pub message: String,
}

impl CredentialError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            cause: CredentialErrorCause::NotFound,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            cause: CredentialErrorCause::Decode,
            message: message.into(),
        }
    }
}

/// Error type for controller operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed credentials
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Login to Camunda Cloud was rejected
    #[error("cannot login to Camunda Cloud: {0}")]
    Auth(String),

    /// Any other failed call to Camunda Cloud
    #[error("Camunda Cloud call failed: {0}")]
    RemoteCall(ApiError),

    /// The object handed to the controller is not a ZeebeCluster
    #[error("managed resource is not a ZeebeCluster: got {0}")]
    TypeMismatch(String),

    /// The reconcile pass was cancelled
    #[error("reconcile cancelled")]
    Cancelled,

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Cancelled => Error::Cancelled,
            e if e.is_unauthorized() => Error::Auth(e.to_string()),
            e => Error::RemoteCall(e),
        }
    }
}

impl Error {
    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 404)
    }

    /// Check if this error should be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(e) => {
                // Retry on network errors, rate limiting, and server errors
                matches!(
                    e,
                    kube::Error::Api(api_err) if api_err.code >= 500 || api_err.code == 429
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::Auth(_) | Error::RemoteCall(_) => true,
            Error::Credential(_) | Error::TypeMismatch(_) | Error::Cancelled => false,
            Error::Serialization(_) => false,
        }
    }

    /// Get the recommended requeue duration for this error
    pub fn requeue_after(&self) -> Duration {
        match self {
            Error::Auth(_) => Duration::from_secs(60),
            Error::Credential(_) => Duration::from_secs(300),
            e if e.is_retryable() => Duration::from_secs(30),
            _ => Duration::from_secs(3600),
        }
    }

    /// Short reason used for events and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Credential(_) => "CannotGetCredentials",
            Error::Auth(_) => "CannotLogin",
            Error::RemoteCall(_) => "RemoteCallFailed",
            Error::TypeMismatch(_) => "TypeMismatch",
            Error::Cancelled => "Cancelled",
            Error::Kube(_) => "KubernetesApiError",
            Error::Serialization(_) => "SerializationError",
        }
    }
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;
