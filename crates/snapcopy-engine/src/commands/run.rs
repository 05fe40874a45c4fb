//! Run orchestration.
//!
//! ## Steps (in order):
//! 1. Connect source and destination clients (one client when both sides
//!    name the same account and region)
//! 2. Locate the source instance
//! 3. Select its latest available manual snapshot
//! 4. Decide whether a copy is needed
//! 5. Inspect the target: only an `available` target is a no-op; an
//!    unfinished copy from an earlier run is resumed, a `failed` one is
//!    terminal unless pruning is enabled
//! 6. dry_run short-circuit (no writes)
//! 7. Replicate or resume

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use snapcopy_core::errors::{ExError, ReplicationError, Result};
use snapcopy_core::{decide, find_instance, select_latest_manual_snapshot};
use snapcopy_core::{log_op_end, log_op_error, log_op_start};
use snapcopy_core::{
    ClientFactory, DecisionReason, ReplicationConfig, ReplicationDecision, Snapshot,
    SnapshotService,
};
use snapcopy_core_types::RunContext;
use tracing::Instrument;

use crate::commands::replicate::{replicate, resume, ReplicateOptions};

/// Options for a replication run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// If true, evaluate the decision but make no mutating call.
    pub dry_run: bool,
}

/// What the run did about the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunAction {
    /// A new copy was made and tagged
    Copied,
    /// A copy left unfinished by an earlier run was waited for and tagged
    Resumed,
    /// An available, up-to-date copy already exists
    UpToDate,
    /// A copy (or resume) is needed but `dry_run` was set
    WouldCopy,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub instance_id: String,
    pub source_snapshot_id: String,
    /// Deterministic destination identifier; reported for no-op runs too
    pub destination_snapshot_id: String,
    pub action: RunAction,
    pub reason: DecisionReason,
}

impl RunOutcome {
    /// Whether the artifact should be written for this outcome
    pub fn is_final(&self) -> bool {
        !matches!(self.action, RunAction::WouldCopy)
    }
}

/// Run one replication from `config.source` to `config.destination`.
///
/// No component reads the environment; everything comes from `config`.
///
/// # Errors
///
/// Every `ReplicationError` raised by the locator, selector, decider,
/// replicator or the factory, unchanged. `CopyFailed` when the target holds
/// a failed copy and pruning is off.
pub async fn run_replication(
    factory: &dyn ClientFactory,
    config: &ReplicationConfig,
    options: RunOptions,
) -> Result<RunOutcome> {
    let ctx = RunContext::new().with_stack_name(config.stack_name.clone());
    let span = tracing::info_span!(
        "run",
        run_id = %ctx.run_id,
        stack_name = ctx.stack_name.as_deref().unwrap_or_default()
    );
    run_in_context(factory, config, options, &ctx)
        .instrument(span)
        .await
}

async fn run_in_context(
    factory: &dyn ClientFactory,
    config: &ReplicationConfig,
    options: RunOptions,
    ctx: &RunContext,
) -> Result<RunOutcome> {
    let start = Instant::now();
    log_op_start!(
        "run_replication",
        run_id = %ctx.run_id,
        dry_run = options.dry_run,
        prune_stale = config.prune_stale
    );

    let result = execute(factory, config, options, ctx).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(outcome) => {
            log_op_end!(
                "run_replication",
                duration_ms = duration_ms,
                run_id = %ctx.run_id,
                target_snapshot_id = %outcome.destination_snapshot_id,
                action = ?outcome.action
            );
        }
        Err(err) => log_op_error!(
            "run_replication",
            ExError::from(err).with_run_id(ctx.run_id.clone()),
            duration_ms = duration_ms
        ),
    }
    result
}

/// State of the destination snapshot holding the target identifier
enum Target {
    /// Available and not stale: nothing to do
    Ready,
    /// Left unfinished by an earlier run
    InProgress,
    /// An earlier copy ended in `failed`
    Failed(Snapshot),
    /// Free, or held by a stale copy the replicator deals with
    NeedsCopy,
}

fn classify(target: Option<Snapshot>, decision: &ReplicationDecision) -> Target {
    let stale = decision
        .stale
        .iter()
        .any(|s| s.identifier == decision.target_identifier);
    match target {
        Some(snapshot) if !stale => {
            if snapshot.status.is_available() {
                Target::Ready
            } else if snapshot.status.is_failed() {
                Target::Failed(snapshot)
            } else {
                Target::InProgress
            }
        }
        _ => Target::NeedsCopy,
    }
}

async fn execute(
    factory: &dyn ClientFactory,
    config: &ReplicationConfig,
    options: RunOptions,
    ctx: &RunContext,
) -> Result<RunOutcome> {
    // Step 1: connect
    let source = factory
        .client(&config.source.account_id, &config.source.region)
        .await?;
    let destination: Arc<dyn SnapshotService> = if config.same_endpoint() {
        Arc::clone(&source)
    } else {
        factory
            .client(&config.destination.account_id, &config.destination.region)
            .await?
    };

    // Steps 2-4: lookup and decision, read-only
    let instance_id = find_instance(source.as_ref(), &config.query).await?;
    let snapshot = select_latest_manual_snapshot(source.as_ref(), &instance_id).await?;
    let decision = decide(
        destination.as_ref(),
        &snapshot,
        &instance_id,
        &config.source.account_id,
    )
    .await?;

    let mut outcome = RunOutcome {
        run_id: ctx.run_id.to_string(),
        instance_id,
        source_snapshot_id: snapshot.identifier.clone(),
        destination_snapshot_id: decision.target_identifier.clone(),
        action: RunAction::UpToDate,
        reason: decision.reason,
    };

    // Step 5: inspect the target
    let target = destination
        .describe_snapshot(&decision.target_identifier)
        .await?;
    let target = classify(target, &decision);
    let resuming = matches!(target, Target::InProgress);

    let mut prune = if config.prune_stale {
        decision.stale.clone()
    } else {
        Vec::new()
    };
    match target {
        Target::Ready => {
            tracing::info!(
                target_snapshot_id = %outcome.destination_snapshot_id,
                "destination already holds a current copy"
            );
            outcome.reason = DecisionReason::UpToDate;
            return Ok(outcome);
        }
        Target::Failed(failed) => {
            if !config.prune_stale {
                return Err(ReplicationError::CopyFailed {
                    snapshot_id: failed.identifier,
                    status: failed.status.to_string(),
                });
            }
            tracing::info!(
                target_snapshot_id = %failed.identifier,
                "earlier copy failed; replacing it"
            );
            prune.push(failed);
        }
        Target::InProgress => {}
        Target::NeedsCopy => {
            if !decision.needs_copy() {
                outcome.reason = DecisionReason::TargetMissing;
            }
        }
    }

    // Step 6: dry_run short-circuit
    if options.dry_run {
        tracing::info!(
            target_snapshot_id = %outcome.destination_snapshot_id,
            reason = outcome.reason.as_str(),
            target_occupied = decision.target_occupied,
            "dry run: copy needed"
        );
        outcome.action = RunAction::WouldCopy;
        return Ok(outcome);
    }

    // Step 7: resume or replicate
    if resuming {
        outcome.destination_snapshot_id = resume(
            destination.as_ref(),
            &snapshot,
            &decision.target_identifier,
            &config.poll,
        )
        .await?;
        outcome.action = RunAction::Resumed;
        return Ok(outcome);
    }

    let replicate_options = ReplicateOptions {
        poll: config.poll,
        source_region: config.copy_source_region().map(str::to_string),
        prune,
    };
    outcome.destination_snapshot_id = replicate(
        source.as_ref(),
        destination.as_ref(),
        &snapshot,
        &decision.target_identifier,
        &config.destination.account_id,
        &replicate_options,
    )
    .await?;
    outcome.action = RunAction::Copied;
    Ok(outcome)
}
