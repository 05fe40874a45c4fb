//! Replicator: the copy state machine.
//!
//! ## Pipeline (in order):
//! 1. Target check: a snapshot holding the target identifier must be one of
//!    the stale copies scheduled for pruning (hard stop, no writes)
//! 2. Prune scheduled stale copies, then wait until the target is free
//! 3. Share: grant restore permission unless already granted
//! 4. Copy under the deterministic identifier
//! 5. Bounded poll until `available` (`failed` and timeout are terminal)
//! 6. Tag the copy with provenance
//!
//! A share is never rolled back when a later step fails.

use std::time::Instant;

use snapcopy_core::errors::{ReplicationError, Result};
use snapcopy_core::provenance::provenance_tags;
use snapcopy_core::{log_op_end, log_op_error, log_op_start};
use snapcopy_core::{CopyRequest, PollPolicy, Snapshot, SnapshotService};

/// Options for a single replicate call.
#[derive(Debug, Clone, Default)]
pub struct ReplicateOptions {
    pub poll: PollPolicy,
    /// Source region, set only when it differs from the destination's
    pub source_region: Option<String>,
    /// Stale destination snapshots to delete before copying.
    /// Empty unless the prune policy is enabled.
    pub prune: Vec<Snapshot>,
}

/// Share, copy, wait and tag. Returns the new destination identifier.
///
/// `target_identifier` is the deterministic destination name for
/// `source_snapshot`.
///
/// # Errors
///
/// - `TargetOccupied` when the target exists and is not scheduled for pruning
/// - `CopyFailed` when the copy reaches `failed`
/// - `PollTimeout` when a wait exceeds `options.poll.max_attempts`
/// - `Service` for remote failures
pub async fn replicate(
    source: &dyn SnapshotService,
    destination: &dyn SnapshotService,
    source_snapshot: &Snapshot,
    target_identifier: &str,
    destination_account_id: &str,
    options: &ReplicateOptions,
) -> Result<String> {
    let start = Instant::now();
    log_op_start!(
        "replicate",
        snapshot_id = %source_snapshot.identifier,
        target_snapshot_id = %target_identifier,
        account_id = %destination_account_id
    );

    let result = execute(
        source,
        destination,
        source_snapshot,
        target_identifier,
        destination_account_id,
        options,
    )
    .await;

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(identifier) => {
            log_op_end!(
                "replicate",
                duration_ms = duration_ms,
                target_snapshot_id = %identifier
            );
        }
        Err(err) => log_op_error!("replicate", err, duration_ms = duration_ms),
    }
    result
}

async fn execute(
    source: &dyn SnapshotService,
    destination: &dyn SnapshotService,
    source_snapshot: &Snapshot,
    target_identifier: &str,
    destination_account_id: &str,
    options: &ReplicateOptions,
) -> Result<String> {
    // Step 1: the target must be free or about to be pruned
    if destination.describe_snapshot(target_identifier).await?.is_some()
        && !options
            .prune
            .iter()
            .any(|s| s.identifier == target_identifier)
    {
        return Err(ReplicationError::TargetOccupied {
            snapshot_id: target_identifier.to_string(),
        });
    }

    // Step 2: prune
    for stale in &options.prune {
        tracing::info!(snapshot_id = %stale.identifier, "deleting stale copy");
        destination.delete_snapshot(&stale.identifier).await?;
    }
    if !options.prune.is_empty() {
        wait_until_absent(destination, target_identifier, &options.poll).await?;
    }

    // Step 3: share
    share(source, &source_snapshot.identifier, destination_account_id).await?;

    // Step 4: copy
    let request = CopyRequest {
        source_arn: source_snapshot.arn.clone(),
        target_identifier: target_identifier.to_string(),
        source_region: options.source_region.clone(),
    };
    let started = destination.copy_snapshot(&request).await?;
    tracing::info!(
        target_snapshot_id = %started.identifier,
        status = %started.status,
        "copy started"
    );

    // Steps 5-6
    finish(destination, source_snapshot, &started.identifier, &options.poll).await
}

/// Wait for an in-progress copy, then tag it with provenance
async fn finish(
    destination: &dyn SnapshotService,
    source_snapshot: &Snapshot,
    copy_identifier: &str,
    poll: &PollPolicy,
) -> Result<String> {
    let copy = wait_for_snapshot(destination, copy_identifier, poll).await?;
    destination
        .add_tags(&copy.arn, &provenance_tags(source_snapshot))
        .await?;
    Ok(copy.identifier)
}

/// Finish a copy that an earlier run started but stopped waiting for.
///
/// No share or copy call is made; the existing copy is polled until
/// `available` and then tagged.
///
/// # Errors
///
/// `CopyFailed`, `PollTimeout` or `Service`, as for `replicate`.
pub async fn resume(
    destination: &dyn SnapshotService,
    source_snapshot: &Snapshot,
    target_identifier: &str,
    poll: &PollPolicy,
) -> Result<String> {
    let start = Instant::now();
    log_op_start!(
        "resume",
        snapshot_id = %source_snapshot.identifier,
        target_snapshot_id = %target_identifier
    );

    let result = finish(destination, source_snapshot, target_identifier, poll).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(identifier) => {
            log_op_end!(
                "resume",
                duration_ms = duration_ms,
                target_snapshot_id = %identifier
            );
        }
        Err(err) => log_op_error!("resume", err, duration_ms = duration_ms),
    }
    result
}

/// Grant restore permission unless `account_id` already holds it
async fn share(source: &dyn SnapshotService, snapshot_id: &str, account_id: &str) -> Result<()> {
    let granted = source.restore_accounts(snapshot_id).await?;
    if granted.iter().any(|a| a == account_id) {
        tracing::debug!(snapshot_id = %snapshot_id, account_id = %account_id, "already shared");
        return Ok(());
    }
    source.grant_restore(snapshot_id, account_id).await
}

/// Poll until the snapshot is `available`
///
/// Sleeps `policy.interval` between attempts, never after the last one.
///
/// # Errors
///
/// `CopyFailed` on `failed`, `PollTimeout` once `policy.max_attempts`
/// describes have not seen `available`, `Service` for remote failures.
pub async fn wait_for_snapshot(
    client: &dyn SnapshotService,
    snapshot_id: &str,
    policy: &PollPolicy,
) -> Result<Snapshot> {
    let mut last_status = String::from("unknown");
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.interval).await;
        }
        match client.describe_snapshot(snapshot_id).await? {
            Some(snapshot) if snapshot.status.is_available() => return Ok(snapshot),
            Some(snapshot) if snapshot.status.is_failed() => {
                return Err(ReplicationError::CopyFailed {
                    snapshot_id: snapshot_id.to_string(),
                    status: snapshot.status.to_string(),
                });
            }
            Some(snapshot) => last_status = snapshot.status.to_string(),
            None => last_status = String::from("missing"),
        }
        tracing::debug!(
            snapshot_id = %snapshot_id,
            attempt = attempt,
            status = %last_status,
            "waiting for snapshot"
        );
    }
    Err(ReplicationError::PollTimeout {
        snapshot_id: snapshot_id.to_string(),
        attempts: policy.max_attempts,
        last_status,
    })
}

async fn wait_until_absent(
    client: &dyn SnapshotService,
    snapshot_id: &str,
    policy: &PollPolicy,
) -> Result<()> {
    let mut last_status = String::from("unknown");
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.interval).await;
        }
        match client.describe_snapshot(snapshot_id).await? {
            None => return Ok(()),
            Some(snapshot) => last_status = snapshot.status.to_string(),
        }
        tracing::debug!(
            snapshot_id = %snapshot_id,
            attempt = attempt,
            status = %last_status,
            "waiting for deletion"
        );
    }
    Err(ReplicationError::PollTimeout {
        snapshot_id: snapshot_id.to_string(),
        attempts: policy.max_attempts,
        last_status,
    })
}
