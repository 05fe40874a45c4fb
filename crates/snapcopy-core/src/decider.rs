//! Replication Decider
//!
//! Decides whether the selected source snapshot still has to be copied.
//!
//! Names cannot answer that question: the destination identifier is derived
//! from the source name, and a source snapshot may be deleted and re-created
//! under the same name (and ARN). The decider therefore compares the
//! provenance tag on each earlier copy with the source's creation time.
//!
//! Rules, in order:
//! 1. no manual snapshots at the destination at all: copy (bootstrap)
//! 2. no earlier copy of this instance from this account: copy
//! 3. the copy holding the target identifier is current: nothing to do.
//!    Stale copies under other names are still reported for pruning.
//! 4. any earlier copy whose provenance differs: copy (stale)
//! 5. otherwise: nothing to do. A copy without provenance is never stale.

use std::time::Instant;

use serde::Serialize;

use crate::errors::Result;
use crate::model::Snapshot;
use crate::naming::{destination_snapshot_identifier, is_copied_from};
use crate::provenance::{check_provenance, ProvenanceCheck};
use crate::service::SnapshotService;
use crate::{log_op_end, log_op_error, log_op_start};

/// Why a copy is or is not needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The destination account holds no manual snapshots
    Bootstrap,
    /// No earlier copy of this instance from the source account
    FirstReplication,
    /// An earlier copy records a different source creation time
    Stale,
    /// The target holds a current copy, or every earlier copy is current
    /// or carries no provenance
    UpToDate,
    /// Earlier copies are current but nothing holds the target identifier.
    /// Assigned by the run after it inspects the target.
    TargetMissing,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::Bootstrap => "bootstrap",
            DecisionReason::FirstReplication => "first_replication",
            DecisionReason::Stale => "stale",
            DecisionReason::UpToDate => "up_to_date",
            DecisionReason::TargetMissing => "target_missing",
        }
    }
}

/// Outcome of `decide`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationDecision {
    pub reason: DecisionReason,
    /// Deterministic destination identifier for the source snapshot
    pub target_identifier: String,
    /// Earlier copies found to be stale. Kept even when the decision is
    /// `UpToDate`, so a prune pass can find them.
    pub stale: Vec<Snapshot>,
    /// Some destination snapshot already holds `target_identifier`
    pub target_occupied: bool,
}

impl ReplicationDecision {
    pub fn needs_copy(&self) -> bool {
        !matches!(self.reason, DecisionReason::UpToDate)
    }
}

/// Full decision, with reason and the stale copies
///
/// `instance_identifier` is the source instance; copies keep it as their
/// instance identifier, which is how they are attributed.
///
/// # Errors
///
/// `Service` for remote failures while listing snapshots or tags.
pub async fn decide(
    destination: &dyn SnapshotService,
    source_snapshot: &Snapshot,
    instance_identifier: &str,
    source_account_id: &str,
) -> Result<ReplicationDecision> {
    let start = Instant::now();
    log_op_start!(
        "decide",
        snapshot_id = %source_snapshot.identifier,
        instance_id = %instance_identifier
    );

    let result = evaluate(
        destination,
        source_snapshot,
        instance_identifier,
        source_account_id,
    )
    .await;

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(decision) => {
            log_op_end!(
                "decide",
                duration_ms = duration_ms,
                reason = decision.reason.as_str(),
                needs_copy = decision.needs_copy(),
                stale_count = decision.stale.len() as u64
            );
        }
        Err(err) => log_op_error!("decide", err, duration_ms = duration_ms),
    }
    result
}

/// Whether `source_snapshot` must be copied to the destination
///
/// # Errors
///
/// `Service` for remote failures.
pub async fn needs_copy(
    destination: &dyn SnapshotService,
    source_snapshot: &Snapshot,
    instance_identifier: &str,
    source_account_id: &str,
) -> Result<bool> {
    decide(
        destination,
        source_snapshot,
        instance_identifier,
        source_account_id,
    )
    .await
    .map(|decision| decision.needs_copy())
}

async fn evaluate(
    destination: &dyn SnapshotService,
    source_snapshot: &Snapshot,
    instance_identifier: &str,
    source_account_id: &str,
) -> Result<ReplicationDecision> {
    let target_identifier =
        destination_snapshot_identifier(&source_snapshot.identifier, source_account_id);
    let existing = destination.list_manual_snapshots(None).await?;

    let target_occupied = existing.iter().any(|s| s.identifier == target_identifier);
    let mut decision = ReplicationDecision {
        reason: DecisionReason::UpToDate,
        target_identifier,
        stale: Vec::new(),
        target_occupied,
    };

    if existing.is_empty() {
        decision.reason = DecisionReason::Bootstrap;
        return Ok(decision);
    }

    let mut matched = 0usize;
    let mut target_current = false;
    for copy in existing.into_iter().filter(|s| {
        is_copied_from(&s.identifier, source_account_id)
            && s.instance_identifier == instance_identifier
    }) {
        matched += 1;
        let tags = destination.list_tags(&copy.arn).await?;
        match check_provenance(&tags, &source_snapshot.created_at) {
            ProvenanceCheck::Current => {
                target_current |= copy.identifier == decision.target_identifier;
            }
            ProvenanceCheck::Missing => {
                tracing::warn!(
                    snapshot_id = %copy.identifier,
                    "copy has no provenance tag; treating it as current"
                );
            }
            ProvenanceCheck::Stale { recorded } => {
                tracing::info!(
                    snapshot_id = %copy.identifier,
                    recorded = %recorded,
                    source_created_at = %source_snapshot.created_at,
                    "found stale copy"
                );
                decision.stale.push(copy);
            }
        }
    }

    decision.reason = if matched == 0 {
        DecisionReason::FirstReplication
    } else if target_current {
        DecisionReason::UpToDate
    } else if !decision.stale.is_empty() {
        DecisionReason::Stale
    } else {
        DecisionReason::UpToDate
    };
    Ok(decision)
}
