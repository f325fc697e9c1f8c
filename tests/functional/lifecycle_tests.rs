//! Lifecycle passes against the in-memory cloud.

use camunda_cloud_operator::controller::external::DeletionOutcome;
use camunda_cloud_operator::controller::state_machine::{LifecycleState, ManagedAction};
use camunda_cloud_operator::crd::ClusterCondition;
use tokio_util::sync::CancellationToken;

use crate::{Call, FakeCloud, ZeebeClusterBuilder, remote_cluster, run_pass, standard_cluster};

#[tokio::test]
async fn test_standard_cluster_lifecycle() {
    let cloud = FakeCloud::new();
    let executor = cloud.executor();
    let cancel = CancellationToken::new();
    let mut cr = standard_cluster("orders");

    let observation = executor.observe(&mut cr, &cancel).await.unwrap();
    assert!(!observation.resource_exists);
    assert!(observation.resource_up_to_date);
    assert_eq!(LifecycleState::of(&cr), LifecycleState::Absent);

    let creation = executor.create(&mut cr, &cancel).await.unwrap();
    assert_eq!(creation.cluster_id, "c-123");
    assert_eq!(cr.cluster_id(), "c-123");
    assert_eq!(cr.condition(), Some(ClusterCondition::Creating));
    assert_eq!(LifecycleState::of(&cr), LifecycleState::Creating);

    let remote = cloud.cluster("c-123").unwrap();
    assert_eq!(remote.name, "orders");
    assert_eq!(remote.plan_type.name, "standard");
    assert_eq!(remote.generation.name, "8.2");
    assert_eq!(remote.channel.name, "stable");
    assert_eq!(remote.region.name, "us-east");

    cloud.set_ready("c-123", "Healthy");
    let observation = executor.observe(&mut cr, &cancel).await.unwrap();
    assert!(observation.resource_exists);
    assert!(observation.resource_up_to_date);
    assert!(observation.connection_details.is_empty());
    assert_eq!(cr.condition(), Some(ClusterCondition::Available));
    assert_eq!(cr.status.as_ref().unwrap().cluster_status.ready, "Healthy");
    assert_eq!(
        LifecycleState::of(&cr),
        LifecycleState::Observed(ClusterCondition::Available)
    );
}

#[tokio::test]
async fn test_create_then_observe_reports_existing() {
    let cloud = FakeCloud::new();
    let executor = cloud.executor();
    let cancel = CancellationToken::new();
    let mut cr = standard_cluster("payments");

    executor.create(&mut cr, &cancel).await.unwrap();
    let observation = executor.observe(&mut cr, &cancel).await.unwrap();

    assert!(observation.resource_exists);
    assert!(observation.resource_up_to_date);
    assert!(!cr.cluster_id().is_empty());
    assert_eq!(cr.condition(), Some(ClusterCondition::Creating));
}

#[tokio::test]
async fn test_observe_never_created_does_not_create() {
    let cloud = FakeCloud::new();
    let executor = cloud.executor();
    let mut cr = standard_cluster("orders");

    let observation = executor
        .observe(&mut cr, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!observation.resource_exists);
    assert!(observation.resource_up_to_date);
    assert_eq!(cloud.creates(), 0);
    assert_eq!(cloud.calls(), vec![Call::Lookup("orders".to_string())]);
    assert_eq!(cr.cluster_id(), "");
}

#[tokio::test]
async fn test_plan_drift_adopts_remote_plan() {
    let cloud = FakeCloud::new().with_cluster(remote_cluster(
        "c-9", "orders", "advanced", "8.2", "stable", "us-east",
    ));
    let executor = cloud.executor();
    let mut cr = ZeebeClusterBuilder::new("orders")
        .plan("standard")
        .cluster_id("c-9")
        .build();

    let observation = executor
        .observe(&mut cr, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(cr.spec.plan_name, "advanced");
    assert!(observation.resource_exists);
    assert!(observation.resource_up_to_date);
    assert_eq!(observation.adopted_fields.len(), 1);
    assert_eq!(observation.adopted_fields[0].declared, "standard");
    assert_eq!(observation.adopted_fields[0].observed, "advanced");
    assert_eq!(cloud.creates(), 0);
}

#[tokio::test]
async fn test_all_fields_adopted_from_remote() {
    let cloud = FakeCloud::new().with_cluster(remote_cluster(
        "c-9", "orders", "advanced", "8.3", "alpha", "eu-west",
    ));
    let mut cr = standard_cluster("orders");

    let observation = cloud
        .executor()
        .observe(&mut cr, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(observation.adopted_fields.len(), 4);
    assert_eq!(cr.spec.plan_name, "advanced");
    assert_eq!(cr.spec.generation_name, "8.3");
    assert_eq!(cr.spec.channel_name, "alpha");
    assert_eq!(cr.spec.region, "eu-west");
}

#[tokio::test]
async fn test_existing_cluster_adopted_by_name() {
    let cloud = FakeCloud::new().with_cluster(remote_cluster(
        "c-42", "orders", "standard", "8.2", "stable", "us-east",
    ));
    let mut cr = standard_cluster("orders");

    let action = run_pass(&cloud.executor(), &mut cr, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(action, ManagedAction::InSync);
    assert_eq!(cr.cluster_id(), "c-42");
    assert_eq!(cr.condition(), Some(ClusterCondition::Available));
    assert_eq!(cloud.creates(), 0);
}

#[tokio::test]
async fn test_detail_failure_marks_unavailable() {
    let cloud = FakeCloud::new().with_cluster(remote_cluster(
        "c-7", "orders", "standard", "8.2", "stable", "us-east",
    ));
    cloud.fail_details("c-7");
    let mut cr = ZeebeClusterBuilder::new("orders").cluster_id("c-7").build();

    let observation = cloud
        .executor()
        .observe(&mut cr, &CancellationToken::new())
        .await
        .unwrap();

    assert!(observation.resource_exists);
    assert!(!observation.resource_up_to_date);
    assert_eq!(cr.condition(), Some(ClusterCondition::Unavailable));
}

#[tokio::test]
async fn test_unrecognised_readiness_is_not_up_to_date() {
    let cloud = FakeCloud::new().with_cluster(remote_cluster(
        "c-7", "orders", "standard", "8.2", "stable", "us-east",
    ));
    cloud.set_ready("c-7", "Updating");
    let mut cr = standard_cluster("orders");

    let action = run_pass(&cloud.executor(), &mut cr, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(action, ManagedAction::Retry);
    assert_eq!(cr.condition(), Some(ClusterCondition::Unavailable));
    assert_eq!(cr.status.as_ref().unwrap().cluster_status.ready, "Updating");
}

#[tokio::test]
async fn test_not_healthy_is_up_to_date_and_unavailable() {
    let cloud = FakeCloud::new().with_cluster(remote_cluster(
        "c-7", "orders", "standard", "8.2", "stable", "us-east",
    ));
    cloud.set_ready("c-7", "Not Healthy");
    let mut cr = standard_cluster("orders");

    let observation = cloud
        .executor()
        .observe(&mut cr, &CancellationToken::new())
        .await
        .unwrap();

    assert!(observation.resource_up_to_date);
    assert_eq!(cr.condition(), Some(ClusterCondition::Unavailable));
}

#[tokio::test]
async fn test_delete_twice_succeeds() {
    let cloud = FakeCloud::new().with_cluster(remote_cluster(
        "c-5", "orders", "standard", "8.2", "stable", "us-east",
    ));
    let executor = cloud.executor();
    let cancel = CancellationToken::new();
    let cr = ZeebeClusterBuilder::new("orders").cluster_id("c-5").build();

    let first = executor.delete(&cr, &cancel).await.unwrap();
    assert_eq!(first.outcome, DeletionOutcome::Deleted);
    assert_eq!(cloud.cluster_count(), 0);

    let second = executor.delete(&cr, &cancel).await.unwrap();
    assert!(matches!(
        second.outcome,
        DeletionOutcome::AlreadyGone { ref note } if note.contains("c-5")
    ));

    let third = executor.delete(&cr, &cancel).await.unwrap();
    assert!(matches!(third.outcome, DeletionOutcome::AlreadyGone { .. }));
}

#[tokio::test]
async fn test_delete_keeps_cluster_id() {
    let cloud = FakeCloud::new().with_cluster(remote_cluster(
        "c-5", "orders", "standard", "8.2", "stable", "us-east",
    ));
    let cr = ZeebeClusterBuilder::new("orders").cluster_id("c-5").build();

    cloud
        .executor()
        .delete(&cr, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(cr.cluster_id(), "c-5");
}

#[tokio::test]
async fn test_deletion_converges_to_finalize() {
    let cloud = FakeCloud::new();
    let executor = cloud.executor();
    let cancel = CancellationToken::new();
    let mut cr = standard_cluster("orders");

    assert_eq!(
        run_pass(&executor, &mut cr, &cancel).await.unwrap(),
        ManagedAction::Create
    );
    cloud.set_ready("c-123", "Healthy");
    assert_eq!(
        run_pass(&executor, &mut cr, &cancel).await.unwrap(),
        ManagedAction::InSync
    );

    cr.metadata.deletion_timestamp = ZeebeClusterBuilder::new("orders")
        .deleting()
        .build()
        .metadata
        .deletion_timestamp;

    assert_eq!(
        run_pass(&executor, &mut cr, &cancel).await.unwrap(),
        ManagedAction::Delete
    );
    assert_eq!(cloud.cluster_count(), 0);

    // The id stays recorded, so the resource still counts as existing and the
    // next pass deletes again, finding the cluster gone.
    assert_eq!(
        run_pass(&executor, &mut cr, &cancel).await.unwrap(),
        ManagedAction::Delete
    );
    let deletion = executor.delete(&cr, &cancel).await.unwrap();
    assert!(matches!(deletion.outcome, DeletionOutcome::AlreadyGone { .. }));
}

#[tokio::test]
async fn test_deleting_never_created_finalizes() {
    let cloud = FakeCloud::new();
    let mut cr = ZeebeClusterBuilder::new("orders").deleting().build();

    let action = run_pass(&cloud.executor(), &mut cr, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(action, ManagedAction::Finalize);
    assert!(
        cloud
            .calls()
            .iter()
            .all(|c| !matches!(c, Call::Create(_) | Call::Delete(_)))
    );
}

#[tokio::test]
async fn test_cluster_removed_in_console_stays_observed() {
    let cloud = FakeCloud::new();
    let executor = cloud.executor();
    let cancel = CancellationToken::new();
    let mut cr = standard_cluster("orders");

    executor.create(&mut cr, &cancel).await.unwrap();
    cloud.remove("c-123");
    cloud.clear_calls();

    let observation = executor.observe(&mut cr, &cancel).await.unwrap();

    assert!(observation.resource_exists);
    assert!(!observation.resource_up_to_date);
    assert!(observation.adopted_fields.is_empty());
    assert_eq!(cr.condition(), Some(ClusterCondition::Unavailable));
    assert_eq!(cloud.creates(), 0);
    assert_eq!(
        cloud.calls(),
        vec![
            Call::Lookup("orders".to_string()),
            Call::Details("c-123".to_string())
        ]
    );
}

#[tokio::test]
async fn test_name_match_with_other_id_is_left_alone() {
    let cloud = FakeCloud::new().with_cluster(remote_cluster(
        "c-999", "orders", "advanced", "8.2", "stable", "us-east",
    ));
    let executor = cloud.executor();
    let cancel = CancellationToken::new();
    let mut cr = ZeebeClusterBuilder::new("orders").cluster_id("c-123").build();

    let observation = executor.observe(&mut cr, &cancel).await.unwrap();

    assert!(observation.resource_exists);
    assert!(!observation.resource_up_to_date);
    assert!(observation.adopted_fields.is_empty());
    assert_eq!(cr.spec.plan_name, "standard");
    assert_eq!(cr.cluster_id(), "c-123");
    assert_eq!(cr.condition(), Some(ClusterCondition::Unavailable));
    assert_eq!(
        cloud.calls(),
        vec![
            Call::Lookup("orders".to_string()),
            Call::Details("c-123".to_string())
        ]
    );

    let mut cr = ZeebeClusterBuilder::new("orders")
        .cluster_id("c-123")
        .deleting()
        .build();
    cloud.clear_calls();
    let action = run_pass(&executor, &mut cr, &cancel).await.unwrap();

    assert_eq!(action, ManagedAction::Delete);
    assert_eq!(
        cloud.calls(),
        vec![
            Call::Lookup("orders".to_string()),
            Call::Details("c-123".to_string()),
            Call::Delete("c-123".to_string())
        ]
    );
    assert_eq!(cloud.cluster("c-999").unwrap().plan_type.name, "advanced");
}

#[tokio::test]
async fn test_cancelled_pass_issues_no_mutation() {
    let cloud = FakeCloud::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut cr = standard_cluster("orders");

    let result = run_pass(&cloud.executor(), &mut cr, &cancel).await;

    assert!(matches!(
        result,
        Err(camunda_cloud_operator::controller::error::Error::Cancelled)
    ));
    assert!(cloud.calls().is_empty());
    assert_eq!(cr.cluster_id(), "");
}

#[tokio::test]
async fn test_update_never_contacts_remote() {
    let cloud = FakeCloud::new();
    let cr = ZeebeClusterBuilder::new("orders").cluster_id("c-1").build();

    let update = cloud.executor().update(&cr).await.unwrap();

    assert!(update.connection_details.is_empty());
    assert!(cloud.calls().is_empty());
}
