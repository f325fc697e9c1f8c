//! Lifecycle state machine for Zeebe clusters.
//!
//! A remote cluster moves through these states:
//!
//! ```text
//! Absent ──Created──▶ Creating ──Observed──▶ Observed(Available|Creating|Unavailable)
//!    │                   │                         │
//!    └──Observed─────────┼─────────────────────────┘   (existing cluster adopted)
//!                        ▼
//!          any ──Deleted──▶ Deleted (terminal)
//! ```
//!
//! `Deleted` is terminal: once the remote cluster is gone the resource is
//! finalized, and a later Create starts a new lifecycle with a new remote id.

use crate::controller::external::ExternalObservation;
use crate::crd::{ClusterCondition, ZeebeCluster};

/// Where a remote cluster is in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifecycleState {
    /// No remote cluster has been created or adopted.
    Absent,
    /// Creation was requested and no health report has been seen yet.
    Creating,
    /// The remote cluster reported its health.
    Observed(ClusterCondition),
    /// The remote cluster was deleted.
    Deleted,
}

impl LifecycleState {
    /// Derive the state recorded in a resource's status.
    pub fn of(cr: &ZeebeCluster) -> Self {
        let Some(status) = cr.status.as_ref().filter(|s| !s.cluster_id.is_empty()) else {
            return LifecycleState::Absent;
        };
        match cr.condition() {
            Some(ClusterCondition::Creating) if status.cluster_status.ready.is_empty() => {
                LifecycleState::Creating
            }
            Some(condition) => LifecycleState::Observed(condition),
            None => LifecycleState::Creating,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Deleted)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Absent => write!(f, "Absent"),
            LifecycleState::Creating => write!(f, "Creating"),
            LifecycleState::Observed(condition) => write!(f, "Observed({condition})"),
            LifecycleState::Deleted => write!(f, "Deleted"),
        }
    }
}

/// Something that happened to the remote cluster during a pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifecycleEvent {
    /// Create returned a new cluster id.
    Created,
    /// Observe mapped the remote health to a condition.
    Observed(ClusterCondition),
    /// Delete succeeded or found nothing to delete.
    Deleted,
}

/// Result of applying an event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransitionResult {
    Success {
        from: LifecycleState,
        to: LifecycleState,
        event: LifecycleEvent,
    },
    InvalidTransition {
        current: LifecycleState,
        event: LifecycleEvent,
    },
}

/// Apply `event` to `current`.
pub fn transition(current: LifecycleState, event: LifecycleEvent) -> TransitionResult {
    use LifecycleEvent as E;
    use LifecycleState as S;

    let to = match (current, event) {
        (S::Deleted, _) => None,
        (S::Absent, E::Created) => Some(S::Creating),
        (_, E::Created) => None,
        (_, E::Observed(condition)) => Some(S::Observed(condition)),
        (_, E::Deleted) => Some(S::Deleted),
    };

    match to {
        Some(to) => TransitionResult::Success {
            from: current,
            to,
            event,
        },
        None => TransitionResult::InvalidTransition { current, event },
    }
}

/// What the reconciler does after observing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ManagedAction {
    /// The remote cluster does not exist: create it.
    Create,
    /// The remote cluster exists but its state is unknown: requeue soon.
    Retry,
    /// Nothing to do until the next poll.
    InSync,
    /// The resource is being deleted and the remote cluster still exists.
    Delete,
    /// The resource is being deleted and nothing remains remotely.
    Finalize,
}

/// Decide the next action from an observation.
///
/// A cluster that exists but is not up to date is retried, never updated:
/// declared fields already follow the remote cluster, so there is nothing to
/// push.
pub fn determine_action(deleting: bool, observation: &ExternalObservation) -> ManagedAction {
    match (deleting, observation.resource_exists) {
        (true, true) => ManagedAction::Delete,
        (true, false) => ManagedAction::Finalize,
        (false, false) => ManagedAction::Create,
        (false, true) if !observation.resource_up_to_date => ManagedAction::Retry,
        (false, true) => ManagedAction::InSync,
    }
}
