//! Connection factory.
//!
//! Turns [`Credentials`] into an authenticated [`Session`]. Rejected logins
//! fail immediately; retrying is the controller's job.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{ApiConfig, ApiError, CamundaCloudClient, ClusterApi, cancellable};
use crate::controller::credentials::Credentials;
use crate::controller::error::Error;

/// Builds unauthenticated API clients.
pub trait ClientProvider: Send + Sync {
    fn new_client(&self) -> Result<Arc<dyn ClusterApi>, ApiError>;
}

/// Provides [`CamundaCloudClient`]s for the configured endpoints.
#[derive(Clone, Debug)]
pub struct CamundaClientProvider {
    config: ApiConfig,
}

impl CamundaClientProvider {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }
}

impl ClientProvider for CamundaClientProvider {
    fn new_client(&self) -> Result<Arc<dyn ClusterApi>, ApiError> {
        Ok(Arc::new(CamundaCloudClient::new(self.config.clone())?))
    }
}

/// An API client that completed login.
#[derive(Clone)]
pub struct Session {
    api: Arc<dyn ClusterApi>,
}

impl Session {
    /// Wrap a client that is already authenticated.
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &dyn ClusterApi {
        self.api.as_ref()
    }
}

/// Exchanges credentials for sessions.
#[derive(Clone)]
pub struct ConnectionFactory {
    provider: Arc<dyn ClientProvider>,
}

impl ConnectionFactory {
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        Self { provider }
    }

    /// Log in and return a session bound to the resulting token.
    pub async fn connect(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<Session, Error> {
        let api = self.provider.new_client().map_err(Error::RemoteCall)?;

        let logged_in = cancellable(
            cancel,
            api.login(&credentials.client_id, &credentials.client_secret),
        )
        .await?;

        if !logged_in {
            warn!(client_id = %credentials.client_id, "Camunda Cloud rejected the credentials");
            return Err(Error::Auth("credentials rejected".to_string()));
        }

        debug!(client_id = %credentials.client_id, "Logged in to Camunda Cloud");
        Ok(Session::new(api))
    }
}
