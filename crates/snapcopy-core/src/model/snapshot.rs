use serde::{Deserialize, Serialize};

use super::SnapshotTime;

/// Lifecycle status of a snapshot
///
/// Anything the service reports besides the three known states is kept
/// verbatim in `Other` and treated as "still in progress".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Creating,
    Available,
    Failed,
    Other(String),
}

impl SnapshotStatus {
    /// Parse a raw service status string
    pub fn parse(raw: &str) -> Self {
        match raw {
            "creating" => SnapshotStatus::Creating,
            "available" => SnapshotStatus::Available,
            "failed" => SnapshotStatus::Failed,
            other => SnapshotStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SnapshotStatus::Creating => "creating",
            SnapshotStatus::Available => "available",
            SnapshotStatus::Failed => "failed",
            SnapshotStatus::Other(raw) => raw,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SnapshotStatus::Available)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SnapshotStatus::Failed)
    }
}

impl std::fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manual snapshot of a database instance
///
/// Identifier and ARN may survive a delete-and-recreate unchanged; only
/// `created_at` distinguishes two logical versions with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub identifier: String,
    /// Identifier of the instance the snapshot was taken from. Copies keep
    /// the original instance identifier.
    pub instance_identifier: String,
    pub arn: String,
    pub status: SnapshotStatus,
    pub created_at: SnapshotTime,
}
