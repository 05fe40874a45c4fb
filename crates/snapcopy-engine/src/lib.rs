//! snapcopy engine - replication orchestration layer
//!
//! Drives a run end to end: connects clients through a `ClientFactory`,
//! runs the core lookup and decision steps, and executes the copy state
//! machine when a copy is needed.

pub mod artifact;
pub mod commands;

pub use artifact::{write_result_artifact, DEFAULT_ARTIFACT_NAME};
pub use commands::replicate::{replicate, resume, wait_for_snapshot, ReplicateOptions};
pub use commands::run::{run_replication, RunAction, RunOptions, RunOutcome};
