//! snapcopy core - replication decision engine
//!
//! This crate provides:
//! - The snapshot/instance model and the canonical timestamp encoding
//! - The `SnapshotService` / `ClientFactory` capability traits and an
//!   in-memory implementation of both
//! - Instance Locator, Snapshot Selector and Replication Decider
//! - Run configuration, the error facility and the logging facility
//!
//! The copy state machine that acts on a decision lives in `snapcopy-engine`.

pub mod config;
pub mod decider;
pub mod errors;
pub mod locator;
pub mod logging_facility;
pub mod memory;
pub mod model;
pub mod naming;
pub mod provenance;
pub mod selector;
pub mod service;

/// Re-exported for the logging macros
pub use snapcopy_core_types as core_types;

// Re-export commonly used types
pub use config::{AccountRegion, InstanceQuery, PollPolicy, RawConfig, ReplicationConfig};
pub use decider::{decide, needs_copy, DecisionReason, ReplicationDecision};
pub use errors::{ExError, ExErrorKind, ReplicationError, Result};
pub use locator::find_instance;
pub use model::{DatabaseInstance, Snapshot, SnapshotStatus, SnapshotTime, TagSet};
pub use selector::select_latest_manual_snapshot;
pub use service::{ClientFactory, CopyRequest, SnapshotService};
