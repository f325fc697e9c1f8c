//! Drift detection between the declared spec and the remote cluster.
//!
//! Once a cluster exists, Camunda Cloud is the source of truth: differing
//! declared fields are overwritten with the remote values (adoption). Field
//! drift never requests an update of the remote cluster.

use crate::client::RemoteCluster;
use crate::crd::ZeebeClusterSpec;

/// A declared field that can drift from the remote cluster.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DriftField {
    Plan,
    Generation,
    Channel,
    Region,
}

impl std::fmt::Display for DriftField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriftField::Plan => write!(f, "planName"),
            DriftField::Generation => write!(f, "generationName"),
            DriftField::Channel => write!(f, "channelName"),
            DriftField::Region => write!(f, "region"),
        }
    }
}

/// One adopted field: what was declared and what the remote reported.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldDrift {
    pub field: DriftField,
    pub declared: String,
    pub observed: String,
}

/// Outcome of comparing declared and observed state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DriftResult {
    pub exists: bool,
    pub up_to_date: bool,
    pub adopted: Vec<FieldDrift>,
}

/// Compare `desired` with the remote cluster and adopt remote values.
///
/// `recorded_id` is the cluster id already stored in status. A remote match
/// carrying a different id belongs to another cluster and is ignored. A
/// resource with neither a remote match nor a recorded id does not exist yet.
pub fn detect(
    desired: &mut ZeebeClusterSpec,
    observed: Option<&RemoteCluster>,
    recorded_id: &str,
) -> DriftResult {
    let observed = observed.filter(|remote| recorded_id.is_empty() || remote.id == recorded_id);
    let Some(remote) = observed else {
        return DriftResult {
            exists: !recorded_id.is_empty(),
            up_to_date: true,
            adopted: Vec::new(),
        };
    };

    let mut adopted = Vec::new();
    let fields = [
        (DriftField::Plan, &mut desired.plan_name, &remote.plan_type.name),
        (
            DriftField::Generation,
            &mut desired.generation_name,
            &remote.generation.name,
        ),
        (DriftField::Channel, &mut desired.channel_name, &remote.channel.name),
        (DriftField::Region, &mut desired.region, &remote.region.name),
    ];
    for (field, declared, observed) in fields {
        if declared != observed {
            adopted.push(FieldDrift {
                field,
                declared: std::mem::replace(declared, observed.clone()),
                observed: observed.clone(),
            });
        }
    }

    DriftResult {
        exists: true,
        up_to_date: true,
        adopted,
    }
}
