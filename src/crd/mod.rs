//! Custom Resource Definitions (CRDs) for camunda-cloud-operator.
//!
//! - `ZeebeCluster`: A Zeebe cluster hosted in Camunda Cloud
//! - `ProviderConfig`: Where to find the Camunda Cloud API credentials
//! - `ProviderConfigUsage`: Which managed resources use which ProviderConfig

mod provider_config;
mod zeebe_cluster;

pub use provider_config::*;
pub use zeebe_cluster::*;
