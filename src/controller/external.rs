//! Lifecycle executor for Zeebe clusters.
//!
//! [`ExternalClient`] implements the four lifecycle operations against an
//! authenticated [`Session`]. Each operation is idempotent and performs no
//! retries of its own: the reconciler reruns the whole pass when an operation
//! fails or reports the cluster as not up to date.
//!
//! Side effects are limited to the `ZeebeCluster` handed in: Observe may adopt
//! remote spec values and the remote cluster id, and writes `clusterStatus` and
//! the `Ready` condition; Create records the new cluster id and sets
//! `Creating`. Nothing else writes conditions.

use std::collections::BTreeMap;
use std::sync::Arc;

use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::client::{ApiError, ClusterRequest, cancellable};
use crate::controller::connection::Session;
use crate::controller::drift::{self, FieldDrift};
use crate::controller::error::{Error, Result};
use crate::controller::status::set_condition;
use crate::controller::status_mapper;
use crate::controller::telemetry::Tracer;
use crate::crd::{ClusterCondition, ZeebeCluster};

/// Details needed to connect to the external resource. Zeebe clusters
/// publish none, so this is always empty.
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// Result of observing the remote cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    /// Whether the remote cluster exists.
    pub resource_exists: bool,
    /// Whether the remote cluster matches the declared state.
    pub resource_up_to_date: bool,
    pub connection_details: ConnectionDetails,
    /// Declared fields overwritten with remote values during this observation.
    pub adopted_fields: Vec<FieldDrift>,
}

impl ExternalObservation {
    fn absent() -> Self {
        Self {
            resource_exists: false,
            resource_up_to_date: true,
            ..Default::default()
        }
    }
}

/// Result of creating the remote cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalCreation {
    pub cluster_id: String,
    pub connection_details: ConnectionDetails,
}

/// Result of updating the remote cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// How a deletion completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The remote cluster was deleted by this call.
    Deleted,
    /// There was nothing to delete.
    AlreadyGone { note: String },
}

/// Result of deleting the remote cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalDeletion {
    pub outcome: DeletionOutcome,
}

/// Executes lifecycle operations for one reconcile pass.
pub struct ExternalClient {
    session: Session,
    tracer: Arc<dyn Tracer>,
}

impl ExternalClient {
    pub fn new(session: Session, tracer: Arc<dyn Tracer>) -> Self {
        Self { session, tracer }
    }

    /// Look up the remote cluster and mirror its state onto `cr`.
    ///
    /// A failed lookup is an error. A failed detail fetch is not: the cluster
    /// is reported as existing but not up to date with condition
    /// `Unavailable`.
    pub async fn observe(
        &self,
        cr: &mut ZeebeCluster,
        cancel: &CancellationToken,
    ) -> Result<ExternalObservation> {
        let name = cr.name_any();
        let span = self.tracer.span("observe", &name);
        self.observe_cluster(cr, &name, cancel).instrument(span).await
    }

    async fn observe_cluster(
        &self,
        cr: &mut ZeebeCluster,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ExternalObservation> {
        let api = self.session.api();
        let remote = cancellable(cancel, api.get_cluster_by_name(name)).await?;

        let recorded_id = cr.cluster_id().to_string();
        let drift = drift::detect(&mut cr.spec, remote.as_ref(), &recorded_id);
        if !drift.exists {
            debug!(name = %name, "Zeebe cluster does not exist");
            return Ok(ExternalObservation::absent());
        }
        for adopted in &drift.adopted {
            info!(
                name = %name,
                field = %adopted.field,
                declared = %adopted.declared,
                observed = %adopted.observed,
                "Adopted remote value"
            );
        }

        let generation = cr.metadata.generation;
        let status = cr.status_mut();
        match &remote {
            Some(remote) if status.cluster_id.is_empty() => {
                info!(name = %name, cluster_id = %remote.id, "Adopted existing cluster id");
                status.cluster_id = remote.id.clone();
            }
            Some(remote) if status.cluster_id != remote.id => {
                warn!(
                    name = %name,
                    recorded = %status.cluster_id,
                    remote = %remote.id,
                    "Cluster with this name has another id, ignoring it"
                );
            }
            _ => {}
        }

        let cluster_id = status.cluster_id.clone();
        let mapping = match cancellable(cancel, api.get_cluster_details(&cluster_id)).await {
            Ok(details) => {
                let mapping = status_mapper::map(&details.ready);
                if !mapping.up_to_date {
                    warn!(name = %name, ready = %details.ready, "Unrecognised cluster readiness");
                }
                status.cluster_status = details;
                mapping
            }
            Err(ApiError::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                warn!(name = %name, cluster_id = %cluster_id, error = %e, "Cannot fetch cluster details");
                status_mapper::unknown()
            }
        };
        set_condition(&mut status.conditions, mapping.condition.to_condition(generation));

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: mapping.up_to_date,
            connection_details: ConnectionDetails::new(),
            adopted_fields: drift.adopted,
        })
    }

    /// Create the remote cluster from the declared spec.
    ///
    /// On failure `clusterId` stays empty, so the next pass observes the
    /// cluster as absent and tries again.
    pub async fn create(
        &self,
        cr: &mut ZeebeCluster,
        cancel: &CancellationToken,
    ) -> Result<ExternalCreation> {
        let name = cr.name_any();
        let span = self.tracer.span("create", &name);
        self.create_cluster(cr, &name, cancel).instrument(span).await
    }

    async fn create_cluster(
        &self,
        cr: &mut ZeebeCluster,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ExternalCreation> {
        let request = ClusterRequest::from_spec(name, &cr.spec);
        let cluster_id = cancellable(cancel, self.session.api().create_cluster(&request)).await?;
        if cluster_id.is_empty() {
            return Err(Error::RemoteCall(ApiError::UnexpectedResponse(
                "create returned an empty cluster id".to_string(),
            )));
        }

        info!(name = %name, cluster_id = %cluster_id, "Created Zeebe cluster");
        let generation = cr.metadata.generation;
        let status = cr.status_mut();
        status.cluster_id = cluster_id.clone();
        set_condition(
            &mut status.conditions,
            ClusterCondition::Creating.to_condition(generation),
        );

        Ok(ExternalCreation {
            cluster_id,
            connection_details: ConnectionDetails::new(),
        })
    }

    /// Update the remote cluster.
    ///
    /// Declared fields follow the remote cluster once it exists, so there is
    /// never anything to push and this does not contact Camunda Cloud.
    pub async fn update(&self, cr: &ZeebeCluster) -> Result<ExternalUpdate> {
        let name = cr.name_any();
        let _entered = self.tracer.span("update", &name).entered();
        debug!(name = %name, "Nothing to update");
        Ok(ExternalUpdate::default())
    }

    /// Delete the remote cluster by its recorded id.
    ///
    /// Deleting a cluster that is already gone succeeds.
    pub async fn delete(
        &self,
        cr: &ZeebeCluster,
        cancel: &CancellationToken,
    ) -> Result<ExternalDeletion> {
        let name = cr.name_any();
        let span = self.tracer.span("delete", &name);
        self.delete_cluster(cr.cluster_id(), &name, cancel)
            .instrument(span)
            .await
    }

    async fn delete_cluster(
        &self,
        cluster_id: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ExternalDeletion> {
        if cluster_id.is_empty() {
            return Ok(already_gone("no cluster id recorded".to_string()));
        }

        match cancellable(cancel, self.session.api().delete_cluster(cluster_id)).await {
            Ok(true) => {
                info!(name = %name, cluster_id = %cluster_id, "Deleted Zeebe cluster");
                Ok(ExternalDeletion {
                    outcome: DeletionOutcome::Deleted,
                })
            }
            Ok(false) => Err(Error::RemoteCall(ApiError::UnexpectedResponse(format!(
                "cluster {cluster_id} was not deleted"
            )))),
            Err(e) if e.is_not_found() => {
                info!(name = %name, cluster_id = %cluster_id, "Zeebe cluster already deleted");
                Ok(already_gone(format!("cluster {cluster_id} not found: {e}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn already_gone(note: String) -> ExternalDeletion {
    ExternalDeletion {
        outcome: DeletionOutcome::AlreadyGone { note },
    }
}
