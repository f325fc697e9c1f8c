//! ZeebeCluster Custom Resource Definition.
//!
//! A ZeebeCluster mirrors one Zeebe cluster hosted in Camunda Cloud. The spec
//! holds the user's declared plan/channel/generation/region; the status holds
//! the remote cluster id and the last health report mirrored from the remote
//! side.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ZeebeCluster is a custom resource for a Zeebe cluster in Camunda Cloud.
///
/// Example:
/// ```yaml
/// apiVersion: cc.camunda.io/v1alpha1
/// kind: ZeebeCluster
/// metadata:
///   name: orders
/// spec:
///   providerConfigRef:
///     name: default
///   region: us-east
///   channelName: stable
///   generationName: "8.2"
///   planName: standard
/// ```
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cc.camunda.io",
    version = "v1alpha1",
    kind = "ZeebeCluster",
    plural = "zeebeclusters",
    shortname = "zb",
    status = "ZeebeClusterStatus",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.clusterStatus.ready"}"#,
    printcolumn = r#"{"name":"Cluster ID", "type":"string", "jsonPath":".status.clusterId"}"#,
    printcolumn = r#"{"name":"Plan", "type":"string", "jsonPath":".spec.planName"}"#,
    printcolumn = r#"{"name":"Channel", "type":"string", "jsonPath":".spec.channelName"}"#,
    printcolumn = r#"{"name":"Generation", "type":"string", "jsonPath":".spec.generationName"}"#,
    printcolumn = r#"{"name":"Region", "type":"string", "jsonPath":".spec.region"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ZeebeClusterSpec {
    /// ProviderConfig holding the Camunda Cloud credentials.
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,

    /// Region (Kubernetes context) the cluster runs in.
    #[serde(default)]
    pub region: String,

    /// Release channel, e.g. "stable" or "alpha".
    #[serde(default)]
    pub channel_name: String,

    /// Zeebe generation, e.g. "8.2".
    #[serde(default)]
    pub generation_name: String,

    /// Cluster plan, e.g. "standard".
    #[serde(default)]
    pub plan_name: String,
}

/// Reference to a cluster-scoped ProviderConfig.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigReference {
    /// Name of the ProviderConfig (default: default).
    #[serde(default = "default_provider_config_name")]
    pub name: String,
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self {
            name: default_provider_config_name(),
        }
    }
}

fn default_provider_config_name() -> String {
    "default".to_string()
}

/// Status of a ZeebeCluster.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZeebeClusterStatus {
    /// Remote cluster id. Empty until creation succeeds.
    #[serde(default)]
    pub cluster_id: String,

    /// Health report mirrored from Camunda Cloud.
    #[serde(default)]
    pub cluster_status: ClusterStatus,

    /// The generation most recently observed by the controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Conditions describing the current state.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Health report of a remote cluster, as returned by Camunda Cloud.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Overall readiness ("Healthy", "Creating", "Not Healthy", ...).
    #[serde(default)]
    pub ready: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zeebe_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operate_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasklist_status: Option<String>,
}

/// Condition describes the state of a cluster at a certain point.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition.
    pub r#type: String,
    /// Status of the condition ("True", "False", "Unknown").
    pub status: String,
    /// Machine-readable reason for the condition's last transition.
    pub reason: String,
    /// Human-readable message indicating details about last transition.
    pub message: String,
    /// Last time the condition transitioned from one status to another.
    pub last_transition_time: String,
    /// The generation of the resource this condition was observed for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    /// Create a new condition.
    pub fn new(
        condition_type: &str,
        status: bool,
        reason: &str,
        message: &str,
        generation: Option<i64>,
    ) -> Self {
        Self {
            r#type: condition_type.to_string(),
            status: if status {
                "True".to_string()
            } else {
                "False".to_string()
            },
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: jiff::Timestamp::now().to_string(),
            observed_generation: generation,
        }
    }

    /// Create a "Ready" condition.
    pub fn ready(ready: bool, reason: &str, message: &str, generation: Option<i64>) -> Self {
        Self::new(READY_CONDITION, ready, reason, message, generation)
    }
}

/// Condition type carrying the cluster's availability.
pub const READY_CONDITION: &str = "Ready";

/// Local availability of a remote cluster.
///
/// Stored as the `Ready` condition: `True` only when `Available`, with the
/// variant name as the reason.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ClusterCondition {
    /// The remote cluster reports healthy.
    Available,
    /// The remote cluster is being provisioned.
    Creating,
    /// The remote cluster is unhealthy or its health is unknown.
    Unavailable,
}

impl ClusterCondition {
    /// All conditions, in declaration order.
    pub const ALL: [ClusterCondition; 3] = [
        ClusterCondition::Available,
        ClusterCondition::Creating,
        ClusterCondition::Unavailable,
    ];

    /// Build the `Ready` condition record for this state.
    pub fn to_condition(self, generation: Option<i64>) -> Condition {
        let message = match self {
            ClusterCondition::Available => "Zeebe cluster is healthy",
            ClusterCondition::Creating => "Zeebe cluster is being created",
            ClusterCondition::Unavailable => "Zeebe cluster is not available",
        };
        Condition::ready(
            self == ClusterCondition::Available,
            &self.to_string(),
            message,
            generation,
        )
    }

    /// Parse the reason of a `Ready` condition back into a cluster condition.
    pub fn from_reason(reason: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.to_string() == reason)
    }
}

impl std::fmt::Display for ClusterCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterCondition::Available => write!(f, "Available"),
            ClusterCondition::Creating => write!(f, "Creating"),
            ClusterCondition::Unavailable => write!(f, "Unavailable"),
        }
    }
}

impl ZeebeCluster {
    /// Recorded remote cluster id, empty when none.
    pub fn cluster_id(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.cluster_id.as_str())
            .unwrap_or("")
    }

    /// Mutable status, initialised on first access.
    pub fn status_mut(&mut self) -> &mut ZeebeClusterStatus {
        self.status.get_or_insert_with(ZeebeClusterStatus::default)
    }

    /// Current availability, read from the `Ready` condition.
    pub fn condition(&self) -> Option<ClusterCondition> {
        self.status
            .as_ref()?
            .conditions
            .iter()
            .find(|c| c.r#type == READY_CONDITION)
            .and_then(|c| ClusterCondition::from_reason(&c.reason))
    }
}
