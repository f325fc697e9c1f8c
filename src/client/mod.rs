//! Camunda Cloud client module.
//!
//! The control loop talks to Camunda Cloud only through the [`ClusterApi`]
//! trait, so the reconciler can be driven by the HTTP client in production and
//! by fakes in tests.
//!
//! ## Architecture
//!
//! - `types`: Wire types (clusters, health report, creation parameters)
//! - `camunda_client`: `reqwest`-based implementation of [`ClusterApi`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use camunda_cloud_operator::client::{CamundaCloudClient, ClusterApi};
//!
//! let client = CamundaCloudClient::new(config)?;
//! if client.login(&id, &secret).await? {
//!     let existing = client.get_cluster_by_name("orders").await?;
//! }
//! ```

pub mod camunda_client;
pub mod types;

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use mockall::automock;

use crate::crd::ClusterStatus;

pub use camunda_client::{ApiConfig, CamundaCloudClient};
pub use types::{ClusterParameters, ClusterRequest, NamedRef, RemoteCluster};

/// Errors returned by Camunda Cloud calls.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("client is not logged in")]
    NotLoggedIn,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unknown {kind} '{name}'")]
    UnknownParameter { kind: &'static str, name: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("call cancelled")]
    Cancelled,
}

impl ApiError {
    /// Whether the remote side reported the target as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
            || matches!(self, ApiError::Http { status, .. } if *status == 404)
    }

    /// Whether the remote side rejected our token or credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::NotLoggedIn)
    }
}

/// Remote cluster-management operations consumed by the control loop.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Exchange client credentials for a session token.
    ///
    /// Returns `Ok(false)` when the credentials are rejected.
    async fn login(&self, client_id: &str, client_secret: &str) -> Result<bool, ApiError>;

    /// Look up a cluster by name. `Ok(None)` when no cluster has that name.
    async fn get_cluster_by_name(&self, name: &str) -> Result<Option<RemoteCluster>, ApiError>;

    /// Fetch the health report of a cluster.
    async fn get_cluster_details(&self, cluster_id: &str) -> Result<ClusterStatus, ApiError>;

    /// Create a cluster and return its remote id.
    async fn create_cluster(&self, request: &ClusterRequest) -> Result<String, ApiError>;

    /// Delete a cluster by id.
    async fn delete_cluster(&self, cluster_id: &str) -> Result<bool, ApiError>;
}

/// Race a remote call against cancellation.
///
/// Cancellation wins ties, so a cancelled pass never starts another mutation.
pub async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        result = call => result,
    }
}
