//! End-to-end runs against the in-memory cloud

mod common;

use common::{
    config, day, existing_copy, seeded_cloud, source_snapshot, DEST_ACCOUNT, DEST_REGION, REGION,
    SOURCE_ACCOUNT,
};
use snapcopy_core::core_types::schema::{EVENT_END_ERROR, FIELD_ERR_RUN_ID};
use snapcopy_core::errors::ReplicationError;
use snapcopy_core::logging_facility::test_capture::init_test_capture;
use snapcopy_core::memory::{MemoryCloud, ServiceCall};
use snapcopy_core::{DecisionReason, SnapshotStatus};
use snapcopy_engine::{run_replication, write_result_artifact, RunAction, RunOptions};

const TARGET: &str = "snap-2024-01-01-copied-from-111111111111";

fn copy_requests(cloud: &MemoryCloud) -> Vec<snapcopy_core::CopyRequest> {
    cloud
        .calls()
        .into_iter()
        .filter_map(|r| match r.call {
            ServiceCall::CopySnapshot(request) => Some(request),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_first_run_copies_tags_and_writes_artifact() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));
    cloud.script_copy_statuses(vec![
        SnapshotStatus::Creating,
        SnapshotStatus::Creating,
        SnapshotStatus::Available,
    ]);

    let outcome = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.action, RunAction::Copied);
    assert_eq!(outcome.reason, DecisionReason::Bootstrap);
    assert_eq!(outcome.destination_snapshot_id, TARGET);

    let copy = cloud.snapshot(DEST_ACCOUNT, REGION, TARGET).unwrap();
    assert!(copy.status.is_available());
    assert_eq!(
        cloud.tags(&copy.arn).get("SourceSnapshotCreateTime"),
        Some(day(1).canonical().as_str())
    );
    assert_eq!(cloud.count("grant_restore"), 1);
    assert_eq!(copy_requests(&cloud)[0].source_region, None);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copied-rds-snapshot-name");
    write_result_artifact(&path, &outcome).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), TARGET);
}

#[tokio::test]
async fn test_second_run_is_a_no_op_with_same_identifier() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));

    let first = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap();
    let mutations_after_first = cloud.mutating_calls().len();
    let second = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(second.action, RunAction::UpToDate);
    assert_eq!(second.destination_snapshot_id, first.destination_snapshot_id);
    assert_eq!(cloud.count("copy_snapshot"), 1);
    assert_eq!(cloud.mutating_calls().len(), mutations_after_first);
}

#[tokio::test]
async fn test_instance_not_found_makes_no_writes() {
    let cloud = MemoryCloud::new();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));

    let err = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ReplicationError::InstanceNotFound { .. }));
    assert!(err.is_lookup_empty());
    assert!(cloud.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_no_available_snapshot_fails_run() {
    let cloud = seeded_cloud();
    cloud.add_snapshot(
        SOURCE_ACCOUNT,
        REGION,
        "snap-in-progress",
        "db-1",
        SnapshotStatus::Creating,
        day(1),
        Default::default(),
    );

    let err = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReplicationError::NoManualSnapshots {
            instance_id: "db-1".to_string()
        }
    );
    assert!(cloud.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_dry_run_reports_without_writing() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));

    let outcome = run_replication(&cloud, &config(), RunOptions { dry_run: true })
        .await
        .unwrap();

    assert_eq!(outcome.action, RunAction::WouldCopy);
    assert!(!outcome.is_final());
    assert_eq!(outcome.destination_snapshot_id, TARGET);
    assert!(cloud.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_recreated_source_with_prune_replaces_stale_copy() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-nightly", day(2));
    existing_copy(&cloud, "snap-nightly", day(1));

    let mut cfg = config();
    cfg.prune_stale = true;
    let outcome = run_replication(&cloud, &cfg, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.action, RunAction::Copied);
    assert_eq!(outcome.reason, DecisionReason::Stale);
    assert_eq!(cloud.count("delete_snapshot"), 1);

    let copy = cloud
        .snapshot(DEST_ACCOUNT, REGION, "snap-nightly-copied-from-111111111111")
        .unwrap();
    assert_eq!(
        cloud.tags(&copy.arn).get("SourceSnapshotCreateTime"),
        Some(day(2).canonical().as_str())
    );
}

#[tokio::test]
async fn test_recreated_source_without_prune_is_target_occupied() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-nightly", day(2));
    existing_copy(&cloud, "snap-nightly", day(1));

    let err = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReplicationError::TargetOccupied {
            snapshot_id: "snap-nightly-copied-from-111111111111".to_string()
        }
    );
    assert!(cloud.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_stale_copy_under_other_name_is_kept() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-02", day(2));
    let old = existing_copy(&cloud, "snap-2024-01-01", day(1));

    let outcome = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.action, RunAction::Copied);
    assert_eq!(outcome.reason, DecisionReason::Stale);
    assert!(cloud.snapshot(DEST_ACCOUNT, REGION, &old.identifier).is_some());
    assert_eq!(cloud.count("delete_snapshot"), 0);
}

#[tokio::test]
async fn test_dated_name_second_run_is_up_to_date() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-02", day(2));
    let old = existing_copy(&cloud, "snap-2024-01-01", day(1));

    let first = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap();
    let mutations_after_first = cloud.mutating_calls().len();
    let second = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(first.action, RunAction::Copied);
    assert_eq!(second.action, RunAction::UpToDate);
    assert_eq!(second.reason, DecisionReason::UpToDate);
    assert_eq!(second.destination_snapshot_id, first.destination_snapshot_id);
    assert_eq!(cloud.count("copy_snapshot"), 1);
    assert_eq!(cloud.mutating_calls().len(), mutations_after_first);
    assert!(cloud.snapshot(DEST_ACCOUNT, REGION, &old.identifier).is_some());
}

#[tokio::test]
async fn test_rerun_after_timeout_resumes_and_tags() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));
    cloud.script_copy_statuses(vec![
        SnapshotStatus::Creating,
        SnapshotStatus::Creating,
        SnapshotStatus::Creating,
        SnapshotStatus::Available,
    ]);
    let mut cfg = config();
    cfg.poll.max_attempts = 2;

    let err = run_replication(&cloud, &cfg, RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReplicationError::PollTimeout { .. }));
    assert_eq!(cloud.count("add_tags"), 0);

    let outcome = run_replication(&cloud, &cfg, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.action, RunAction::Resumed);
    assert_eq!(outcome.destination_snapshot_id, TARGET);
    assert_eq!(cloud.count("copy_snapshot"), 1);
    let copy = cloud.snapshot(DEST_ACCOUNT, REGION, TARGET).unwrap();
    assert!(copy.status.is_available());
    assert_eq!(
        cloud.tags(&copy.arn).get("SourceSnapshotCreateTime"),
        Some(day(1).canonical().as_str())
    );
}

#[tokio::test]
async fn test_dry_run_over_unfinished_copy_would_copy() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));
    cloud.add_snapshot(
        DEST_ACCOUNT,
        REGION,
        TARGET,
        "db-1",
        SnapshotStatus::Creating,
        day(1),
        Default::default(),
    );

    let outcome = run_replication(&cloud, &config(), RunOptions { dry_run: true })
        .await
        .unwrap();

    assert_eq!(outcome.action, RunAction::WouldCopy);
    assert!(cloud.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_rerun_after_failed_copy_stays_failed() {
    let capture = init_test_capture();
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));
    cloud.script_copy_statuses(vec![SnapshotStatus::Creating, SnapshotStatus::Failed]);

    let first = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap_err();
    let mutations_after_first = cloud.mutating_calls().len();
    let second = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap_err();

    let failed = ReplicationError::CopyFailed {
        snapshot_id: TARGET.to_string(),
        status: "failed".to_string(),
    };
    assert_eq!(first, failed);
    assert_eq!(second, failed);
    assert_eq!(cloud.mutating_calls().len(), mutations_after_first);
    assert_eq!(cloud.count("add_tags"), 0);

    let run_errors = capture.count_events(|e| {
        e.is("run_replication", EVENT_END_ERROR)
            && e.field("err.code") == Some("ERR_COPY_FAILED")
            && e.field(FIELD_ERR_RUN_ID).is_some()
    });
    assert!(run_errors >= 2);
}

#[tokio::test]
async fn test_rerun_after_failed_copy_with_prune_copies_again() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));
    cloud.script_copy_statuses(vec![SnapshotStatus::Creating, SnapshotStatus::Failed]);

    run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap_err();

    cloud.script_copy_statuses(vec![SnapshotStatus::Available]);
    let mut cfg = config();
    cfg.prune_stale = true;
    let outcome = run_replication(&cloud, &cfg, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.action, RunAction::Copied);
    assert_eq!(cloud.count("delete_snapshot"), 1);
    assert_eq!(cloud.count("copy_snapshot"), 2);
    let copy = cloud.snapshot(DEST_ACCOUNT, REGION, TARGET).unwrap();
    assert!(copy.status.is_available());
    assert!(cloud
        .tags(&copy.arn)
        .get("SourceSnapshotCreateTime")
        .is_some());
}

#[tokio::test]
async fn test_untagged_copy_under_other_name_does_not_hide_missing_target() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-02", day(2));
    cloud.add_snapshot(
        DEST_ACCOUNT,
        REGION,
        TARGET,
        "db-1",
        SnapshotStatus::Available,
        day(1),
        Default::default(),
    );

    let outcome = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.action, RunAction::Copied);
    assert_eq!(outcome.reason, DecisionReason::TargetMissing);
    assert_eq!(
        outcome.destination_snapshot_id,
        "snap-2024-01-02-copied-from-111111111111"
    );
    assert_eq!(cloud.count("copy_snapshot"), 1);
}

#[tokio::test]
async fn test_same_endpoint_reuses_one_client() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));
    let mut cfg = config();
    cfg.destination = cfg.source.clone();

    run_replication(&cloud, &cfg, RunOptions { dry_run: true })
        .await
        .unwrap();

    assert_eq!(
        cloud.connections(),
        vec![(SOURCE_ACCOUNT.to_string(), REGION.to_string())]
    );
}

#[tokio::test]
async fn test_cross_region_copy_names_source_region() {
    let cloud = seeded_cloud();
    source_snapshot(&cloud, "snap-2024-01-01", day(1));
    let mut cfg = config();
    cfg.destination.region = DEST_REGION.to_string();

    run_replication(&cloud, &cfg, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(cloud.connections().len(), 2);
    assert_eq!(
        copy_requests(&cloud)[0].source_region.as_deref(),
        Some(REGION)
    );
    assert!(cloud.snapshot(DEST_ACCOUNT, DEST_REGION, TARGET).is_some());
}

#[tokio::test]
async fn test_credential_failure_surfaces_as_service_error() {
    let cloud = seeded_cloud();
    cloud.fail_on("client", "AccessDenied: sts:AssumeRole");

    let err = run_replication(&cloud, &config(), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ReplicationError::Service { ref op, .. } if op == "client"));
    assert!(cloud.calls().is_empty());
}

#[test]
fn test_outcome_serializes_as_one_json_object() {
    let outcome = snapcopy_engine::RunOutcome {
        run_id: "r".to_string(),
        instance_id: "db-1".to_string(),
        source_snapshot_id: "snap-1".to_string(),
        destination_snapshot_id: "snap-1-copied-from-111111111111".to_string(),
        action: RunAction::UpToDate,
        reason: DecisionReason::UpToDate,
    };

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["action"], "up_to_date");
    assert_eq!(json["reason"], "up_to_date");
    assert_eq!(
        json["destination_snapshot_id"],
        "snap-1-copied-from-111111111111"
    );
}
