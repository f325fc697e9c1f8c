//! Test fixtures and builder patterns for ZeebeCluster.

use std::collections::BTreeMap;

use camunda_cloud_operator::crd::{
    ClusterCondition, ProviderConfigReference, ZeebeCluster, ZeebeClusterSpec, ZeebeClusterStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

/// Builder for creating ZeebeCluster test fixtures.
///
/// # Example
/// ```
/// let cluster = ZeebeClusterBuilder::new("orders")
///     .plan("advanced")
///     .cluster_id("c-123")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct ZeebeClusterBuilder {
    name: String,
    provider_config: String,
    region: String,
    channel: String,
    zeebe_generation: String,
    plan: String,
    labels: BTreeMap<String, String>,
    generation: Option<i64>,
    uid: Option<String>,
    cluster_id: Option<String>,
    condition: Option<ClusterCondition>,
    deleting: bool,
}

impl ZeebeClusterBuilder {
    /// Create a builder declaring us-east/stable/8.2/standard.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider_config: "default".to_string(),
            region: "us-east".to_string(),
            channel: "stable".to_string(),
            zeebe_generation: "8.2".to_string(),
            plan: "standard".to_string(),
            labels: BTreeMap::new(),
            generation: Some(1),
            uid: None,
            cluster_id: None,
            condition: None,
            deleting: false,
        }
    }

    pub fn provider_config(mut self, name: impl Into<String>) -> Self {
        self.provider_config = name.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Set the declared Zeebe generation (not the object generation).
    pub fn zeebe_generation(mut self, generation: impl Into<String>) -> Self {
        self.zeebe_generation = generation.into();
        self
    }

    pub fn plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = plan.into();
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set the object generation.
    pub fn generation(mut self, generation: i64) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Record a remote cluster id in status.
    pub fn cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }

    /// Record a `Ready` condition in status.
    pub fn condition(mut self, condition: ClusterCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Mark the resource as being deleted.
    pub fn deleting(mut self) -> Self {
        self.deleting = true;
        self
    }

    /// Build the ZeebeCluster.
    pub fn build(self) -> ZeebeCluster {
        let status = if self.cluster_id.is_some() || self.condition.is_some() {
            Some(ZeebeClusterStatus {
                cluster_id: self.cluster_id.unwrap_or_default(),
                conditions: self
                    .condition
                    .map(|c| vec![c.to_condition(self.generation)])
                    .unwrap_or_default(),
                ..Default::default()
            })
        } else {
            None
        };

        ZeebeCluster {
            metadata: ObjectMeta {
                name: Some(self.name),
                labels: if self.labels.is_empty() {
                    None
                } else {
                    Some(self.labels)
                },
                generation: self.generation,
                uid: self.uid,
                deletion_timestamp: self.deleting.then(|| Time(k8s_openapi::chrono::Utc::now())),
                ..Default::default()
            },
            spec: ZeebeClusterSpec {
                provider_config_ref: ProviderConfigReference {
                    name: self.provider_config,
                },
                region: self.region,
                channel_name: self.channel,
                generation_name: self.zeebe_generation,
                plan_name: self.plan,
            },
            status,
        }
    }
}

impl Default for ZeebeClusterBuilder {
    fn default() -> Self {
        Self::new("test-cluster")
    }
}

/// The scenario cluster: us-east/stable/8.2/standard, never created.
pub fn standard_cluster(name: &str) -> ZeebeCluster {
    ZeebeClusterBuilder::new(name)
        .uid(format!("test-uid-{}", name))
        .build()
}
