//! Wire types for the Camunda Cloud console API.

use serde::{Deserialize, Serialize};

use crate::client::ApiError;
use crate::crd::{ClusterStatus, ZeebeClusterSpec};

/// An id/name pair as Camunda Cloud reports plans, channels, generations and
/// regions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamedRef {
    #[serde(rename = "uuid", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl NamedRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A cluster as listed by `GET /clusters`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCluster {
    #[serde(rename = "uuid")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub plan_type: NamedRef,
    #[serde(default)]
    pub generation: NamedRef,
    #[serde(default)]
    pub channel: NamedRef,
    #[serde(rename = "k8sContext", default)]
    pub region: NamedRef,
    #[serde(default)]
    pub status: ClusterStatus,
}

/// A channel and the generations it offers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelParameter {
    #[serde(rename = "uuid")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub default_generation: Option<NamedRef>,
    #[serde(default)]
    pub allowed_generations: Vec<NamedRef>,
}

/// Creation parameters from `GET /clusters/parameters`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterParameters {
    #[serde(default)]
    pub channels: Vec<ChannelParameter>,
    #[serde(default)]
    pub cluster_plan_types: Vec<NamedRef>,
    #[serde(default)]
    pub regions: Vec<NamedRef>,
}

/// A creation request expressed with the names users declare.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterRequest {
    pub name: String,
    pub plan: String,
    pub channel: String,
    pub generation: String,
    pub region: String,
}

impl ClusterRequest {
    /// Build a request for the named cluster from its declared spec.
    pub fn from_spec(name: &str, spec: &ZeebeClusterSpec) -> Self {
        Self {
            name: name.to_string(),
            plan: spec.plan_name.clone(),
            channel: spec.channel_name.clone(),
            generation: spec.generation_name.clone(),
            region: spec.region.clone(),
        }
    }
}

/// Body of `POST /clusters`, expressed with remote ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterBody {
    pub name: String,
    pub plan_type_id: String,
    pub channel_id: String,
    pub generation_id: String,
    pub region_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateClusterResponse {
    pub cluster_id: String,
}

impl ClusterParameters {
    /// Translate declared names into remote ids.
    ///
    /// The generation must be one the chosen channel allows.
    pub fn resolve(&self, request: &ClusterRequest) -> Result<CreateClusterBody, ApiError> {
        let plan = find_by_name(&self.cluster_plan_types, "plan", &request.plan)?;
        let region = find_by_name(&self.regions, "region", &request.region)?;
        let channel = self
            .channels
            .iter()
            .find(|c| c.name == request.channel)
            .ok_or_else(|| ApiError::UnknownParameter {
                kind: "channel",
                name: request.channel.clone(),
            })?;
        let generation = find_by_name(
            &channel.allowed_generations,
            "generation",
            &request.generation,
        )?;

        Ok(CreateClusterBody {
            name: request.name.clone(),
            plan_type_id: plan.id.clone(),
            channel_id: channel.id.clone(),
            generation_id: generation.id.clone(),
            region_id: region.id.clone(),
        })
    }
}

fn find_by_name<'a>(
    refs: &'a [NamedRef],
    kind: &'static str,
    name: &str,
) -> Result<&'a NamedRef, ApiError> {
    refs.iter()
        .find(|r| r.name == name)
        .ok_or_else(|| ApiError::UnknownParameter {
            kind,
            name: name.to_string(),
        })
}
