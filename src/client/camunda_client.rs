//! Camunda Cloud client built on reqwest.
//!
//! Logs in with the OAuth client-credentials flow and keeps the bearer token
//! for the lifetime of the client. One client is created per reconcile pass.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::client::types::{ClusterParameters, CreateClusterResponse, RemoteCluster};
use crate::client::{ApiError, ClusterApi, ClusterRequest};
use crate::crd::ClusterStatus;

/// Default console API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.cloud.camunda.io";

/// Default OAuth token endpoint.
pub const DEFAULT_LOGIN_URL: &str = "https://login.cloud.camunda.io/oauth/token";

/// Default OAuth audience for the console API.
pub const DEFAULT_AUDIENCE: &str = "api.cloud.camunda.io";

/// Endpoints and timeouts for the Camunda Cloud API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the console API.
    pub api_url: String,
    /// OAuth token endpoint.
    pub login_url: String,
    /// OAuth audience requested at login.
    pub audience: String,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    audience: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Camunda Cloud console API client.
pub struct CamundaCloudClient {
    http: reqwest::Client,
    config: ApiConfig,
    token: RwLock<Option<String>>,
}

impl CamundaCloudClient {
    /// Create a client. No network traffic happens until [`ClusterApi::login`].
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    async fn bearer(&self) -> Result<String, ApiError> {
        self.token.read().await.clone().ok_or(ApiError::NotLoggedIn)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(self.config.url(path))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        Ok(check(response, path).await?.json().await?)
    }
}

/// Map HTTP failures onto [`ApiError`] variants.
async fn check(response: Response, target: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(target.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized(message)),
        _ => Err(ApiError::Http {
            status: status.as_u16(),
            message,
        }),
    }
}

#[async_trait]
impl ClusterApi for CamundaCloudClient {
    #[instrument(skip_all)]
    async fn login(&self, client_id: &str, client_secret: &str) -> Result<bool, ApiError> {
        let response = self
            .http
            .post(&self.config.login_url)
            .json(&TokenRequest {
                grant_type: "client_credentials",
                audience: &self.config.audience,
                client_id,
                client_secret,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!(status = %response.status(), "Login rejected");
                return Ok(false);
            }
            _ => {}
        }

        let token: TokenResponse = check(response, "oauth/token").await?.json().await?;
        *self.token.write().await = Some(token.access_token);
        debug!("Logged in to Camunda Cloud");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn get_cluster_by_name(&self, name: &str) -> Result<Option<RemoteCluster>, ApiError> {
        let clusters: Vec<RemoteCluster> = self.get_json("/clusters").await?;
        Ok(clusters.into_iter().find(|c| c.name == name))
    }

    #[instrument(skip(self))]
    async fn get_cluster_details(&self, cluster_id: &str) -> Result<ClusterStatus, ApiError> {
        let cluster: RemoteCluster = self.get_json(&format!("/clusters/{cluster_id}")).await?;
        Ok(cluster.status)
    }

    #[instrument(skip(self), fields(name = %request.name))]
    async fn create_cluster(&self, request: &ClusterRequest) -> Result<String, ApiError> {
        let parameters: ClusterParameters = self.get_json("/clusters/parameters").await?;
        let body = parameters.resolve(request)?;

        let response = self
            .http
            .post(self.config.url("/clusters"))
            .bearer_auth(self.bearer().await?)
            .json(&body)
            .send()
            .await?;
        let created: CreateClusterResponse = check(response, "/clusters").await?.json().await?;
        debug!(cluster_id = %created.cluster_id, "Cluster created");
        Ok(created.cluster_id)
    }

    #[instrument(skip(self))]
    async fn delete_cluster(&self, cluster_id: &str) -> Result<bool, ApiError> {
        let path = format!("/clusters/{cluster_id}");
        let response = self
            .http
            .delete(self.config.url(&path))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        check(response, &path).await?;
        Ok(true)
    }
}
