//! ProviderConfig and ProviderConfigUsage Custom Resource Definitions.
//!
//! A ProviderConfig tells the operator where to find the Camunda Cloud API
//! client credentials. Every ZeebeCluster that connects through a
//! ProviderConfig records a ProviderConfigUsage so the link stays visible.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProviderConfig configures access to Camunda Cloud.
///
/// Example:
/// ```yaml
/// apiVersion: cc.camunda.io/v1alpha1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   credentials:
///     source: Secret
///     secretRef:
///       namespace: crossplane-system
///       name: camunda-cloud-credentials
///       key: credentials
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cc.camunda.io",
    version = "v1alpha1",
    kind = "ProviderConfig",
    plural = "providerconfigs",
    printcolumn = r#"{"name":"Source", "type":"string", "jsonPath":".spec.credentials.source"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Credentials used to log in to Camunda Cloud.
    pub credentials: ProviderCredentials,
}

/// Where the credentials payload lives.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// Source of the credentials payload.
    pub source: CredentialsSource,

    /// Secret key selector, used when source is Secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,

    /// Environment variable selector, used when source is Environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvSelector>,

    /// Filesystem selector, used when source is Filesystem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsSelector>,
}

/// Supported credential sources.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
pub enum CredentialsSource {
    Secret,
    Environment,
    Filesystem,
}

impl std::fmt::Display for CredentialsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialsSource::Secret => write!(f, "Secret"),
            CredentialsSource::Environment => write!(f, "Environment"),
            CredentialsSource::Filesystem => write!(f, "Filesystem"),
        }
    }
}

/// Reference to a key within a namespaced Secret.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Namespace of the Secret.
    pub namespace: String,

    /// Name of the Secret.
    pub name: String,

    /// Key within the Secret holding the JSON payload (default: credentials).
    #[serde(default = "default_credentials_key")]
    pub key: String,
}

fn default_credentials_key() -> String {
    "credentials".to_string()
}

/// Environment variable holding the JSON payload.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct EnvSelector {
    pub name: String,
}

/// File holding the JSON payload.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct FsSelector {
    pub path: String,
}

/// ProviderConfigUsage records that a managed resource uses a ProviderConfig.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cc.camunda.io",
    version = "v1alpha1",
    kind = "ProviderConfigUsage",
    plural = "providerconfigusages",
    printcolumn = r#"{"name":"Config", "type":"string", "jsonPath":".spec.providerConfigRef.name"}"#,
    printcolumn = r#"{"name":"Resource", "type":"string", "jsonPath":".spec.resourceRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigUsageSpec {
    /// The ProviderConfig in use.
    pub provider_config_ref: super::ProviderConfigReference,

    /// The managed resource using it.
    pub resource_ref: TypedReference,
}

/// Reference to a cluster-scoped object by kind and name.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

/// Label carrying the ProviderConfig name on usage records.
pub const PROVIDER_CONFIG_LABEL: &str = "cc.camunda.io/provider-config";

/// Labels applied to a usage record for the given ProviderConfig.
pub fn usage_labels(provider_config: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(PROVIDER_CONFIG_LABEL.to_string(), provider_config.to_string())])
}
