// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for camunda-cloud-operator.
//!
//! Uses proptest to generate random inputs and verify invariants.

use proptest::prelude::*;

use camunda_cloud_operator::client::{NamedRef, RemoteCluster};
use camunda_cloud_operator::controller::drift;
use camunda_cloud_operator::controller::external::ExternalObservation;
use camunda_cloud_operator::controller::state_machine::{
    LifecycleEvent, LifecycleState, ManagedAction, TransitionResult, determine_action, transition,
};
use camunda_cloud_operator::controller::status_mapper;
use camunda_cloud_operator::crd::{ClusterCondition, ZeebeClusterSpec};

const KNOWN_READINESS: [&str; 3] = ["Healthy", "Creating", "Not Healthy"];

/// Strategy for short field values, including the empty string.
fn field_value() -> impl Strategy<Value = String> {
    "[a-z0-9.-]{0,8}"
}

fn any_condition() -> impl Strategy<Value = ClusterCondition> {
    prop_oneof![
        Just(ClusterCondition::Available),
        Just(ClusterCondition::Creating),
        Just(ClusterCondition::Unavailable),
    ]
}

fn any_state() -> impl Strategy<Value = LifecycleState> {
    prop_oneof![
        Just(LifecycleState::Absent),
        Just(LifecycleState::Creating),
        any_condition().prop_map(LifecycleState::Observed),
        Just(LifecycleState::Deleted),
    ]
}

fn any_event() -> impl Strategy<Value = LifecycleEvent> {
    prop_oneof![
        Just(LifecycleEvent::Created),
        any_condition().prop_map(LifecycleEvent::Observed),
        Just(LifecycleEvent::Deleted),
    ]
}

fn spec(plan: String, generation: String, channel: String, region: String) -> ZeebeClusterSpec {
    ZeebeClusterSpec {
        plan_name: plan,
        generation_name: generation,
        channel_name: channel,
        region,
        ..Default::default()
    }
}

fn remote(plan: String, generation: String, channel: String, region: String) -> RemoteCluster {
    RemoteCluster {
        id: "c-1".to_string(),
        name: "orders".to_string(),
        plan_type: NamedRef::new("p", plan),
        generation: NamedRef::new("g", generation),
        channel: NamedRef::new("c", channel),
        region: NamedRef::new("r", region),
        ..Default::default()
    }
}

proptest! {
    /// Property: readiness values outside the table are unavailable and not
    /// up to date.
    #[test]
    fn test_status_mapping_is_closed(ready in ".{0,16}") {
        let mapping = status_mapper::map(&ready);
        if KNOWN_READINESS.contains(&ready.as_str()) {
            prop_assert!(mapping.up_to_date);
        } else {
            prop_assert_eq!(mapping, status_mapper::unknown());
            prop_assert_eq!(mapping.condition, ClusterCondition::Unavailable);
        }
    }

    /// Property: after detection every declared field equals the remote value,
    /// and exactly the differing fields are reported.
    #[test]
    fn test_drift_adopts_remote_values(
        declared in (field_value(), field_value(), field_value(), field_value()),
        observed in (field_value(), field_value(), field_value(), field_value()),
    ) {
        let differing = [
            declared.0 != observed.0,
            declared.1 != observed.1,
            declared.2 != observed.2,
            declared.3 != observed.3,
        ]
        .iter()
        .filter(|d| **d)
        .count();

        let mut desired = spec(declared.0, declared.1, declared.2, declared.3);
        let cluster = remote(
            observed.0.clone(),
            observed.1.clone(),
            observed.2.clone(),
            observed.3.clone(),
        );
        let result = drift::detect(&mut desired, Some(&cluster), "");

        prop_assert!(result.exists);
        prop_assert!(result.up_to_date);
        prop_assert_eq!(result.adopted.len(), differing);
        prop_assert_eq!(desired.plan_name, observed.0);
        prop_assert_eq!(desired.generation_name, observed.1);
        prop_assert_eq!(desired.channel_name, observed.2);
        prop_assert_eq!(desired.region, observed.3);
    }

    /// Property: detection is idempotent; a second pass adopts nothing.
    #[test]
    fn test_drift_second_pass_is_clean(
        declared in (field_value(), field_value(), field_value(), field_value()),
        observed in (field_value(), field_value(), field_value(), field_value()),
    ) {
        let mut desired = spec(declared.0, declared.1, declared.2, declared.3);
        let cluster = remote(observed.0, observed.1, observed.2, observed.3);
        drift::detect(&mut desired, Some(&cluster), "");
        let second = drift::detect(&mut desired, Some(&cluster), "");
        prop_assert!(second.adopted.is_empty());
    }

    /// Property: a remote match whose id differs from the recorded one never
    /// changes the declared spec.
    #[test]
    fn test_drift_ignores_other_cluster_id(
        declared in (field_value(), field_value(), field_value(), field_value()),
        observed in (field_value(), field_value(), field_value(), field_value()),
        recorded in "c-[0-9]{2,4}",
    ) {
        let mut desired = spec(declared.0, declared.1, declared.2, declared.3);
        let before = desired.clone();
        let cluster = remote(observed.0, observed.1, observed.2, observed.3);
        let result = drift::detect(&mut desired, Some(&cluster), &recorded);
        prop_assert!(result.exists);
        prop_assert!(result.adopted.is_empty());
        prop_assert_eq!(desired, before);
    }

    /// Property: without a remote match the resource exists iff an id is recorded.
    #[test]
    fn test_drift_without_remote(recorded in "(c-[0-9]{1,4})?") {
        let mut desired = ZeebeClusterSpec::default();
        let result = drift::detect(&mut desired, None, &recorded);
        prop_assert_eq!(result.exists, !recorded.is_empty());
        prop_assert!(result.up_to_date);
        prop_assert!(result.adopted.is_empty());
    }

    /// Property: a missing remote cluster is never deleted and an existing one
    /// is never created.
    #[test]
    fn test_action_follows_existence(
        deleting in any::<bool>(),
        exists in any::<bool>(),
        up_to_date in any::<bool>(),
    ) {
        let observation = ExternalObservation {
            resource_exists: exists,
            resource_up_to_date: up_to_date,
            ..Default::default()
        };
        let action = determine_action(deleting, &observation);
        if exists {
            prop_assert_ne!(action, ManagedAction::Create);
            prop_assert_ne!(action, ManagedAction::Finalize);
        } else {
            prop_assert_ne!(action, ManagedAction::Delete);
        }
        prop_assert_eq!(deleting, matches!(action, ManagedAction::Delete | ManagedAction::Finalize));
    }

    /// Property: Deleted is terminal.
    #[test]
    fn test_deleted_is_terminal(event in any_event()) {
        let is_invalid = matches!(
            transition(LifecycleState::Deleted, event),
            TransitionResult::InvalidTransition { .. }
        );
        prop_assert!(is_invalid);
    }

    /// Property: every live state can be deleted.
    #[test]
    fn test_all_live_states_can_delete(state in any_state()) {
        let result = transition(state, LifecycleEvent::Deleted);
        if state.is_terminal() {
            let is_invalid = matches!(result, TransitionResult::InvalidTransition { .. });
            prop_assert!(is_invalid);
        } else {
            let reaches_deleted = matches!(
                result,
                TransitionResult::Success { to: LifecycleState::Deleted, .. }
            );
            prop_assert!(reaches_deleted);
        }
    }
}
