//! Controller module for camunda-cloud-operator.
//!
//! Contains the reconciliation loop and the pieces it drives, leaves first:
//!
//! - `credentials`: ProviderConfig to [`credentials::Credentials`]
//! - `connection`: credentials to an authenticated session
//! - `drift`: declared spec against the remote cluster
//! - `status_mapper`: remote readiness to a local condition
//! - `external`: the Observe/Create/Update/Delete lifecycle executor
//! - `connector`: one Connect per reconcile pass
//! - `state_machine`: lifecycle states and the next managed action
//! - `reconciler`: the kube-rs reconcile function and error policy

pub mod connection;
pub mod connector;
pub mod context;
pub mod credentials;
pub mod drift;
pub mod error;
pub mod external;
pub mod finalizer;
pub mod reconciler;
pub mod state_machine;
pub mod status;
pub mod status_mapper;
pub mod telemetry;
