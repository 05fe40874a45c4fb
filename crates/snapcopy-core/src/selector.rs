//! Snapshot Selector

use std::time::Instant;

use crate::errors::{ReplicationError, Result};
use crate::model::Snapshot;
use crate::service::SnapshotService;
use crate::{log_op_end, log_op_error, log_op_start};

/// Latest `available` manual snapshot of `instance_identifier`
///
/// # Errors
///
/// `NoManualSnapshots` when the instance has no available manual snapshot,
/// `Service` for remote failures.
pub async fn select_latest_manual_snapshot(
    client: &dyn SnapshotService,
    instance_identifier: &str,
) -> Result<Snapshot> {
    let start = Instant::now();
    log_op_start!(
        "select_latest_manual_snapshot",
        instance_id = %instance_identifier
    );

    let result = client
        .list_manual_snapshots(Some(instance_identifier))
        .await
        .and_then(|snapshots| {
            latest_available(snapshots).ok_or_else(|| ReplicationError::NoManualSnapshots {
                instance_id: instance_identifier.to_string(),
            })
        });

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(snapshot) => {
            log_op_end!(
                "select_latest_manual_snapshot",
                duration_ms = duration_ms,
                snapshot_id = %snapshot.identifier,
                created_at = %snapshot.created_at
            );
        }
        Err(err) => log_op_error!(
            "select_latest_manual_snapshot",
            err,
            duration_ms = duration_ms
        ),
    }
    result
}

/// Pick the newest available snapshot
///
/// Equal creation times fall back to the greater identifier, so the choice
/// never depends on listing order.
pub fn latest_available(snapshots: impl IntoIterator<Item = Snapshot>) -> Option<Snapshot> {
    snapshots
        .into_iter()
        .filter(|s| s.status.is_available())
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.identifier.cmp(&b.identifier))
        })
}
