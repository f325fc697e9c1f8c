//! Reconciliation loop for ZeebeCluster.
//!
//! Each pass connects once, observes the remote cluster, and then creates it,
//! deletes it, or leaves it alone. Conditions and the cluster id are written
//! by the lifecycle executor; this module persists them, publishes events and
//! decides when to run again.

use std::sync::Arc;
use std::time::Instant;

use kube::{
    Api, Resource, ResourceExt,
    api::{DynamicObject, Patch, PatchParams},
    runtime::controller::Action,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::controller::{
    context::Context,
    error::{Error, Result},
    external::{DeletionOutcome, ExternalClient, ExternalObservation},
    finalizer::{add_finalizer, has_finalizer, remove_finalizer},
    state_machine::{
        LifecycleEvent, LifecycleState, ManagedAction, TransitionResult, determine_action,
        transition,
    },
};
use crate::crd::{ClusterCondition, ZeebeCluster, ZeebeClusterStatus};

/// Finalizer guarding deletion of the remote cluster
pub const FINALIZER: &str = "finalizer.cc.camunda.io";

/// Reconcile a ZeebeCluster
///
/// This is the main reconciliation function called by the controller.
pub async fn reconcile(obj: Arc<ZeebeCluster>, ctx: Arc<Context>) -> Result<Action> {
    let start_time = Instant::now();
    let name = obj.name_any();
    debug!(name = %name, "Reconciling ZeebeCluster");

    let result = reconcile_cluster(&obj, &ctx).await;

    match &result {
        Ok(_) => {
            if let Some(ref health_state) = ctx.health_state {
                let duration = start_time.elapsed().as_secs_f64();
                health_state.metrics.record_reconcile(&name, duration);
                health_state.touch();
            }
        }
        Err(Error::Cancelled) => debug!(name = %name, "Reconcile cancelled"),
        Err(e) => {
            ctx.publish_warning_event(&obj, e.reason(), "Reconciling", Some(e.to_string()))
                .await;
        }
    }
    result
}

async fn reconcile_cluster(obj: &ZeebeCluster, ctx: &Context) -> Result<Action> {
    let name = obj.name_any();
    let api: Api<ZeebeCluster> = Api::all(ctx.client.clone());
    let deleting = obj.metadata.deletion_timestamp.is_some();

    if deleting && !has_finalizer(obj, FINALIZER) {
        return Ok(Action::await_change());
    }
    if !deleting && add_finalizer(&api, obj, FINALIZER).await? {
        info!(name = %name, "Added finalizer");
        return Ok(Action::requeue(std::time::Duration::from_secs(1)));
    }

    let cancel = ctx.shutdown.child_token();
    let mut cr = obj.clone();
    let before = LifecycleState::of(&cr);

    let external = ctx.connector.connect(&cr, &cancel).await?;
    let observation = external.observe(&mut cr, &cancel).await;
    record_operation(ctx, "observe", &observation);
    let observation = observation?;

    if observation.resource_exists {
        if let Some(condition) = cr.condition() {
            log_transition(&name, before, LifecycleEvent::Observed(condition));
        }
    }
    if !observation.adopted_fields.is_empty() {
        persist_spec(&api, &mut cr).await?;
        ctx.publish_normal_event(
            &cr,
            "AdoptedRemoteState",
            "Observing",
            Some(adoption_note(&observation)),
        )
        .await;
    }

    let action = determine_action(deleting, &observation);
    debug!(name = %name, action = ?action, "Observed ZeebeCluster");

    match action {
        ManagedAction::Create => create(&external, &mut cr, &api, ctx, &cancel).await,
        ManagedAction::Delete => delete(&external, &cr, &api, ctx, &cancel).await,
        ManagedAction::Finalize => finalize(&cr, &api, ctx).await,
        ManagedAction::Retry => {
            update_status(&api, &cr).await?;
            record_condition(ctx, &cr);
            Ok(Action::requeue(ctx.intervals.wait))
        }
        ManagedAction::InSync => {
            update_status(&api, &cr).await?;
            record_condition(ctx, &cr);
            let requeue = match cr.condition() {
                Some(ClusterCondition::Available) => ctx.intervals.poll,
                _ => ctx.intervals.wait,
            };
            Ok(Action::requeue(requeue))
        }
    }
}

async fn create(
    external: &ExternalClient,
    cr: &mut ZeebeCluster,
    api: &Api<ZeebeCluster>,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<Action> {
    let name = cr.name_any();
    let before = LifecycleState::of(cr);
    let creation = external.create(cr, cancel).await;
    record_operation(ctx, "create", &creation);
    let creation = creation?;

    log_transition(&name, before, LifecycleEvent::Created);
    update_status(api, cr).await?;
    record_condition(ctx, cr);
    ctx.publish_normal_event(
        cr,
        "CreatedExternalResource",
        "Creating",
        Some(format!("Created Zeebe cluster {}", creation.cluster_id)),
    )
    .await;
    Ok(Action::requeue(ctx.intervals.wait))
}

async fn delete(
    external: &ExternalClient,
    cr: &ZeebeCluster,
    api: &Api<ZeebeCluster>,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<Action> {
    let deletion = external.delete(cr, cancel).await;
    record_operation(ctx, "delete", &deletion);

    match deletion?.outcome {
        DeletionOutcome::Deleted => {
            ctx.publish_normal_event(
                cr,
                "DeletingExternalResource",
                "Deleting",
                Some(format!("Deleting Zeebe cluster {}", cr.cluster_id())),
            )
            .await;
            update_status(api, cr).await?;
            Ok(Action::requeue(ctx.intervals.wait))
        }
        DeletionOutcome::AlreadyGone { note } => {
            info!(name = %cr.name_any(), note = %note, "Nothing left to delete");
            finalize(cr, api, ctx).await
        }
    }
}

/// Release the resource once the remote cluster is gone.
///
/// `clusterId` is kept in status for diagnostics.
async fn finalize(cr: &ZeebeCluster, api: &Api<ZeebeCluster>, ctx: &Context) -> Result<Action> {
    let name = cr.name_any();
    log_transition(&name, LifecycleState::of(cr), LifecycleEvent::Deleted);

    match update_status(api, cr).await {
        Err(e) if e.is_not_found() => {}
        other => other?,
    }
    remove_finalizer(api, cr, FINALIZER).await?;

    if let Some(ref health_state) = ctx.health_state {
        health_state.metrics.remove_cluster(&name);
    }
    ctx.publish_normal_event(
        cr,
        "DeletedExternalResource",
        "Deleting",
        Some("Zeebe cluster deleted".to_string()),
    )
    .await;
    info!(name = %name, "Finalized ZeebeCluster");
    Ok(Action::await_change())
}

/// Error policy for the controller
pub fn error_policy(obj: Arc<ZeebeCluster>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = obj.name_any();

    // Record error metric
    if let Some(ref health_state) = ctx.health_state {
        health_state.metrics.record_error(&name, error.reason());
    }

    match error {
        Error::Cancelled | Error::TypeMismatch(_) => {
            debug!(name = %name, error = %error, "Not retrying until the object changes");
            Action::await_change()
        }
        e if e.is_not_found() => {
            debug!(name = %name, "Resource not found (likely deleted)");
            Action::await_change()
        }
        e if e.is_retryable() => {
            warn!(name = %name, error = %error, "Retryable error, will retry");
            Action::requeue(e.requeue_after())
        }
        e => {
            error!(name = %name, error = %error, "Non-retryable error");
            Action::requeue(e.requeue_after())
        }
    }
}

/// Convert an untyped object into a ZeebeCluster.
///
/// Entry point for callers holding a `DynamicObject`; the typed controller
/// never goes through here. Objects of any other kind are rejected with
/// [`Error::TypeMismatch`].
pub fn managed_resource(obj: DynamicObject) -> Result<ZeebeCluster> {
    let api_version = ZeebeCluster::api_version(&());
    let kind = ZeebeCluster::kind(&());
    match &obj.types {
        Some(types) if types.api_version == api_version && types.kind == kind => {}
        Some(types) => {
            return Err(Error::TypeMismatch(format!(
                "{}/{}",
                types.api_version, types.kind
            )));
        }
        None => return Err(Error::TypeMismatch("object without type".to_string())),
    }
    let value = serde_json::to_value(&obj)?;
    Ok(serde_json::from_value(value)?)
}

/// Write adopted spec values back to the API server.
///
/// The spec change bumps the generation; `cr` picks up the stored metadata so
/// the following status write reports it.
async fn persist_spec(api: &Api<ZeebeCluster>, cr: &mut ZeebeCluster) -> Result<()> {
    let patch = serde_json::json!({ "spec": cr.spec });
    let stored = api
        .patch(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    cr.metadata.generation = stored.metadata.generation;
    cr.metadata.resource_version = stored.metadata.resource_version;
    Ok(())
}

/// Status as written to the API server, stamped with the current generation.
fn observed_status(cr: &ZeebeCluster) -> ZeebeClusterStatus {
    let mut status = cr.status.clone().unwrap_or_default();
    status.observed_generation = cr.metadata.generation;
    for condition in &mut status.conditions {
        condition.observed_generation = cr.metadata.generation;
    }
    status
}

/// Update the status of a ZeebeCluster
async fn update_status(api: &Api<ZeebeCluster>, cr: &ZeebeCluster) -> Result<()> {
    let patch = serde_json::json!({ "status": observed_status(cr) });
    api.patch_status(&cr.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

fn record_operation<T>(ctx: &Context, operation: &str, result: &Result<T>) {
    if let Some(ref health_state) = ctx.health_state {
        let outcome = match result {
            Ok(_) => "success",
            Err(Error::Cancelled) => "cancelled",
            Err(_) => "error",
        };
        health_state.metrics.record_operation(operation, outcome);
    }
}

fn record_condition(ctx: &Context, cr: &ZeebeCluster) {
    if let Some(ref health_state) = ctx.health_state {
        health_state
            .metrics
            .set_cluster_condition(&cr.name_any(), cr.condition());
    }
}

fn log_transition(name: &str, current: LifecycleState, event: LifecycleEvent) {
    match transition(current, event) {
        TransitionResult::Success { from, to, .. } if from != to => {
            info!(name = %name, from = %from, to = %to, "Lifecycle transition");
        }
        TransitionResult::Success { .. } => {}
        TransitionResult::InvalidTransition { current, event } => {
            warn!(name = %name, state = %current, event = ?event, "Unexpected lifecycle event");
        }
    }
}

fn adoption_note(observation: &ExternalObservation) -> String {
    observation
        .adopted_fields
        .iter()
        .map(|d| format!("{}: {} -> {}", d.field, d.declared, d.observed))
        .collect::<Vec<_>>()
        .join(", ")
}
