//! Provenance tagging of copied snapshots
//!
//! A destination copy records the creation time of the source version it was
//! made from. That tag, not the name or ARN, decides whether the copy is
//! current.

use crate::model::{Snapshot, SnapshotTime, TagSet};

/// Tag key carrying the source snapshot's creation time
pub const PROVENANCE_TAG_KEY: &str = "SourceSnapshotCreateTime";

/// Result of comparing a destination copy's provenance with the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvenanceCheck {
    /// Recorded time equals the source's current creation time
    Current,
    /// Recorded time differs: the copy was made from an older version
    Stale { recorded: String },
    /// No provenance tag; never treated as stale
    Missing,
}

impl ProvenanceCheck {
    pub fn is_stale(&self) -> bool {
        matches!(self, ProvenanceCheck::Stale { .. })
    }
}

/// Tags to attach to a fresh copy of `source`
pub fn provenance_tags(source: &Snapshot) -> TagSet {
    TagSet::new().with(PROVENANCE_TAG_KEY, source.created_at.canonical())
}

/// Compare the provenance recorded in `tags` with `source_created_at`
pub fn check_provenance(tags: &TagSet, source_created_at: &SnapshotTime) -> ProvenanceCheck {
    match tags.get(PROVENANCE_TAG_KEY) {
        None => ProvenanceCheck::Missing,
        Some(recorded) if source_created_at.matches_recorded(recorded) => ProvenanceCheck::Current,
        Some(recorded) => ProvenanceCheck::Stale {
            recorded: recorded.to_string(),
        },
    }
}
