//! Credential resolution.
//!
//! Follows a ZeebeCluster's ProviderConfig reference to the credentials
//! payload and decodes it into [`Credentials`].

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use serde::Deserialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::controller::error::{CredentialError, Error};
use crate::crd::{CredentialsSource, ProviderConfig, ProviderCredentials};

/// Camunda Cloud API client credentials.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    #[serde(rename = "ccClientId")]
    pub client_id: String,
    #[serde(rename = "ccSecretId")]
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Decode a credentials payload.
pub fn decode(payload: &[u8]) -> Result<Credentials, CredentialError> {
    let credentials: Credentials =
        serde_json::from_slice(payload).map_err(|e| CredentialError::decode(e.to_string()))?;
    if credentials.client_id.is_empty() {
        return Err(CredentialError::decode("ccClientId is empty"));
    }
    if credentials.client_secret.is_empty() {
        return Err(CredentialError::decode("ccSecretId is empty"));
    }
    Ok(credentials)
}

/// Lookups the resolver needs from the Kubernetes API.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProviderConfigSource: Send + Sync {
    /// Fetch a ProviderConfig. `Ok(None)` when it does not exist.
    async fn get_provider_config(&self, name: &str) -> Result<Option<ProviderConfig>, Error>;

    /// Read one key of a Secret. `Ok(None)` when the Secret or key does not exist.
    async fn read_secret_key(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, Error>;
}

/// [`ProviderConfigSource`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeProviderConfigSource {
    client: Client,
}

impl KubeProviderConfigSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderConfigSource for KubeProviderConfigSource {
    async fn get_provider_config(&self, name: &str) -> Result<Option<ProviderConfig>, Error> {
        let api: Api<ProviderConfig> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn read_secret_key(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get_opt(name).await?;
        Ok(secret
            .and_then(|s| s.data)
            .and_then(|data| data.get(key).map(|bytes| bytes.0.clone())))
    }
}

/// Resolves ProviderConfig references into credentials.
#[derive(Clone)]
pub struct CredentialResolver {
    source: Arc<dyn ProviderConfigSource>,
}

impl CredentialResolver {
    pub fn new(source: Arc<dyn ProviderConfigSource>) -> Self {
        Self { source }
    }

    /// Fetch the ProviderConfig by name.
    pub async fn provider_config(&self, name: &str) -> Result<ProviderConfig, Error> {
        self.source
            .get_provider_config(name)
            .await?
            .ok_or_else(|| CredentialError::not_found(format!("ProviderConfig {name}")).into())
    }

    /// Extract and decode the credentials a ProviderConfig points at.
    pub async fn resolve(&self, provider_config: &ProviderConfig) -> Result<Credentials, Error> {
        let payload = self.extract(&provider_config.spec.credentials).await?;
        Ok(decode(&payload)?)
    }

    async fn extract(&self, credentials: &ProviderCredentials) -> Result<Vec<u8>, Error> {
        let source = credentials.source;
        debug!(source = %source, "Extracting credentials");
        match source {
            CredentialsSource::Secret => {
                let selector = credentials.secret_ref.as_ref().ok_or_else(|| {
                    CredentialError::not_found("secretRef is required for source Secret")
                })?;
                self.source
                    .read_secret_key(&selector.namespace, &selector.name, &selector.key)
                    .await?
                    .ok_or_else(|| {
                        CredentialError::not_found(format!(
                            "key {} of Secret {}/{}",
                            selector.key, selector.namespace, selector.name
                        ))
                        .into()
                    })
            }
            CredentialsSource::Environment => {
                let selector = credentials.env.as_ref().ok_or_else(|| {
                    CredentialError::not_found("env is required for source Environment")
                })?;
                std::env::var(&selector.name)
                    .map(String::into_bytes)
                    .map_err(|_| {
                        CredentialError::not_found(format!(
                            "environment variable {}",
                            selector.name
                        ))
                        .into()
                    })
            }
            CredentialsSource::Filesystem => {
                let selector = credentials.fs.as_ref().ok_or_else(|| {
                    CredentialError::not_found("fs is required for source Filesystem")
                })?;
                tokio::fs::read(&selector.path).await.map_err(|e| {
                    CredentialError::not_found(format!("file {}: {}", selector.path, e)).into()
                })
            }
        }
    }
}
