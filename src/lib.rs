//! camunda-cloud-operator library crate
//!
//! Reconciles `ZeebeCluster` resources against Camunda Cloud. This module
//! wires the controller together; the control loop lives in [`controller`].

pub mod client;
pub mod config;
pub mod controller;
pub mod crd;
pub mod health;

pub use config::{ConfigError, OperatorConfig};
pub use health::HealthState;

use std::sync::Arc;

use futures::{Stream, StreamExt};
use kube::runtime::controller::Config as ControllerConfig;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::{Controller, WatchStreamExt, predicates, reflector, watcher};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use controller::connection::{CamundaClientProvider, ConnectionFactory};
use controller::connector::{Connector, KubeUsageTracker};
use controller::context::Context;
use controller::credentials::{CredentialResolver, KubeProviderConfigSource};
use controller::reconciler::{error_policy, reconcile};
use controller::telemetry::SpanTracer;
use crd::ZeebeCluster;

/// Create the default watcher configuration.
///
/// `any_semantic()` gives more reliable resource discovery in test environments.
fn default_watcher_config() -> WatcherConfig {
    WatcherConfig::default().any_semantic()
}

/// Create a filtered stream for a resource type with standard optimizations.
///
/// This creates a reflector-backed stream that:
/// - Maintains an in-memory cache via reflector
/// - Uses automatic retry with exponential backoff on errors
/// - Converts watch events to objects (Added/Modified only)
/// - Filters out status-only updates via generation predicate
///
/// Returns the reflector store (for cache lookups) and the filtered stream.
fn create_filtered_stream<K>(
    api: Api<K>,
    watcher_config: WatcherConfig,
) -> (
    reflector::Store<K>,
    impl Stream<Item = Result<K, watcher::Error>>,
)
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug + Send + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let (reader, writer) = reflector::store();
    let stream = reflector(writer, watcher(api, watcher_config))
        .default_backoff()
        .applied_objects()
        .predicate_filter(predicates::generation);
    (reader, stream)
}

/// Build the controller context for the given configuration.
pub fn build_context(
    client: Client,
    config: &OperatorConfig,
    shutdown: CancellationToken,
    health_state: Option<Arc<HealthState>>,
) -> Context {
    let connector = Connector::new(
        CredentialResolver::new(Arc::new(KubeProviderConfigSource::new(client.clone()))),
        Arc::new(KubeUsageTracker::new(client.clone())),
        ConnectionFactory::new(Arc::new(CamundaClientProvider::new(config.api.clone()))),
        Arc::new(SpanTracer),
    );
    Context::new(
        client,
        connector,
        config.intervals,
        shutdown,
        config.pod_name.clone(),
        health_state,
    )
}

/// Run the ZeebeCluster controller.
///
/// Watches ZeebeCluster resources cluster-wide and reconciles up to
/// `max_concurrent_reconciles` of them at once. Cancelling `shutdown` aborts
/// in-flight calls to Camunda Cloud.
///
/// If health_state is provided, metrics will be recorded for reconciliations.
pub async fn run_controller(
    client: Client,
    config: OperatorConfig,
    shutdown: CancellationToken,
    health_state: Option<Arc<HealthState>>,
) {
    info!(
        api_url = %config.api.api_url,
        concurrency = config.max_concurrent_reconciles,
        "Starting controller for ZeebeCluster resources"
    );

    // Mark as ready once we start the controller
    if let Some(ref state) = health_state {
        state.set_ready(true).await;
    }

    let ctx = Arc::new(build_context(
        client.clone(),
        &config,
        shutdown,
        health_state,
    ));

    let clusters: Api<ZeebeCluster> = Api::all(client);
    let (reader, resource_stream) = create_filtered_stream(clusters, default_watcher_config());

    Controller::for_stream(resource_stream, reader)
        .with_config(ControllerConfig::default().concurrency(config.max_concurrent_reconciles))
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    debug!("Reconciled: {}", obj.name);
                }
                Err(e) => {
                    // NotFound errors are expected after deletion when a late
                    // watch event triggers reconciliation for a deleted object.
                    let is_not_found = match &e {
                        kube::runtime::controller::Error::ObjectNotFound(_) => true,
                        kube::runtime::controller::Error::ReconcilerFailed(err, _) => {
                            err.is_not_found()
                        }
                        _ => false,
                    };
                    if is_not_found {
                        debug!("Object no longer exists (likely deleted): {:?}", e);
                    } else {
                        error!("Reconciliation error: {:?}", e);
                    }
                }
            }
        })
        .await;

    // This should never complete in normal operation
    error!("Controller stream ended unexpectedly");
}
