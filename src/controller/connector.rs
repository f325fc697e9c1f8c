//! Connect: turns a `ZeebeCluster` into a lifecycle executor.
//!
//! One connect per reconcile pass:
//! 1. Record that the resource uses its ProviderConfig.
//! 2. Fetch the ProviderConfig.
//! 3. Extract and decode the credentials it points at.
//! 4. Log in and bind an [`ExternalClient`] to the session.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::controller::connection::ConnectionFactory;
use crate::controller::context::FIELD_MANAGER;
use crate::controller::credentials::CredentialResolver;
use crate::controller::error::Result;
use crate::controller::external::ExternalClient;
use crate::controller::telemetry::Tracer;
use crate::crd::{
    ProviderConfigUsage, ProviderConfigUsageSpec, TypedReference, ZeebeCluster, usage_labels,
};

/// Records which managed resources use which ProviderConfig.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsageTracker: Send + Sync {
    async fn track(&self, cr: &ZeebeCluster) -> Result<()>;
}

/// [`UsageTracker`] writing `ProviderConfigUsage` objects with server-side apply.
#[derive(Clone)]
pub struct KubeUsageTracker {
    client: Client,
}

impl KubeUsageTracker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageTracker for KubeUsageTracker {
    async fn track(&self, cr: &ZeebeCluster) -> Result<()> {
        let usage = usage_record(cr);
        let name = usage.name_any();
        let api: Api<ProviderConfigUsage> = Api::all(self.client.clone());
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&usage),
        )
        .await?;
        Ok(())
    }
}

/// Build the usage record for a resource.
///
/// The record is named after the resource UID and owned by the resource, so
/// it is garbage collected with it.
pub fn usage_record(cr: &ZeebeCluster) -> ProviderConfigUsage {
    let uid = cr.uid().unwrap_or_default();
    let provider_config = cr.spec.provider_config_ref.clone();
    let resource_ref = TypedReference {
        api_version: ZeebeCluster::api_version(&()).to_string(),
        kind: ZeebeCluster::kind(&()).to_string(),
        name: cr.name_any(),
        uid: uid.clone(),
    };
    let owner = OwnerReference {
        api_version: resource_ref.api_version.clone(),
        kind: resource_ref.kind.clone(),
        name: resource_ref.name.clone(),
        uid: uid.clone(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    };

    let mut usage = ProviderConfigUsage::new(
        &uid,
        ProviderConfigUsageSpec {
            provider_config_ref: provider_config,
            resource_ref,
        },
    );
    usage.metadata.labels = Some(usage_labels(&usage.spec.provider_config_ref.name));
    usage.metadata.owner_references = Some(vec![owner]);
    usage
}

/// Produces an [`ExternalClient`] for each reconcile pass.
#[derive(Clone)]
pub struct Connector {
    resolver: CredentialResolver,
    usage: Arc<dyn UsageTracker>,
    factory: ConnectionFactory,
    tracer: Arc<dyn Tracer>,
}

impl Connector {
    pub fn new(
        resolver: CredentialResolver,
        usage: Arc<dyn UsageTracker>,
        factory: ConnectionFactory,
        tracer: Arc<dyn Tracer>,
    ) -> Self {
        Self {
            resolver,
            usage,
            factory,
            tracer,
        }
    }

    /// Resolve credentials for `cr`, log in, and return a bound executor.
    pub async fn connect(
        &self,
        cr: &ZeebeCluster,
        cancel: &CancellationToken,
    ) -> Result<ExternalClient> {
        self.usage.track(cr).await?;

        let provider_config_name = &cr.spec.provider_config_ref.name;
        let provider_config = self.resolver.provider_config(provider_config_name).await?;
        let credentials = self.resolver.resolve(&provider_config).await?;
        debug!(
            name = %cr.name_any(),
            provider_config = %provider_config_name,
            "Resolved credentials"
        );

        let session = self.factory.connect(&credentials, cancel).await?;
        Ok(ExternalClient::new(session, self.tracer.clone()))
    }
}
