//! Snapshot service capability interface
//!
//! The core never talks to a cloud SDK directly. It consumes this trait, and
//! obtains account/region scoped implementations through `ClientFactory`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;
use crate::model::{DatabaseInstance, Snapshot, TagSet};

/// Parameters of a cross-account snapshot copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    /// ARN of the shared source snapshot
    pub source_arn: String,
    /// Deterministic identifier for the destination snapshot
    pub target_identifier: String,
    /// Set when the source lives in another region
    pub source_region: Option<String>,
}

/// Remote database-snapshot service, scoped to one account and region
///
/// All listing calls return complete results; implementations follow
/// pagination themselves.
#[async_trait]
pub trait SnapshotService: Send + Sync {
    /// List all database instances visible to the credential scope
    ///
    /// # Errors
    ///
    /// `ReplicationError::Service` on any remote failure.
    async fn list_instances(&self) -> Result<Vec<DatabaseInstance>>;

    /// List tags attached to the resource named by `arn`
    ///
    /// # Errors
    ///
    /// `ReplicationError::Service` on any remote failure.
    async fn list_tags(&self, arn: &str) -> Result<TagSet>;

    /// List manual snapshots, either of one instance or of the whole account
    ///
    /// # Errors
    ///
    /// `ReplicationError::Service` on any remote failure.
    async fn list_manual_snapshots(&self, instance_identifier: Option<&str>)
        -> Result<Vec<Snapshot>>;

    /// Describe one snapshot; `Ok(None)` when it does not exist
    ///
    /// # Errors
    ///
    /// `ReplicationError::Service` on any remote failure other than "not found".
    async fn describe_snapshot(&self, snapshot_identifier: &str) -> Result<Option<Snapshot>>;

    /// Accounts currently allowed to restore (and therefore copy) the snapshot
    ///
    /// # Errors
    ///
    /// `ReplicationError::Service` on any remote failure.
    async fn restore_accounts(&self, snapshot_identifier: &str) -> Result<Vec<String>>;

    /// Grant `account_id` restore permission on the snapshot
    ///
    /// # Errors
    ///
    /// `ReplicationError::Service` on any remote failure.
    async fn grant_restore(&self, snapshot_identifier: &str, account_id: &str) -> Result<()>;

    /// Start a copy into this service's account; returns the new snapshot
    /// in whatever state the service reports immediately
    ///
    /// # Errors
    ///
    /// `ReplicationError::Service` on any remote failure.
    async fn copy_snapshot(&self, request: &CopyRequest) -> Result<Snapshot>;

    /// Attach tags to the resource named by `arn`
    ///
    /// # Errors
    ///
    /// `ReplicationError::Service` on any remote failure.
    async fn add_tags(&self, arn: &str, tags: &TagSet) -> Result<()>;

    /// Delete a manual snapshot
    ///
    /// # Errors
    ///
    /// `ReplicationError::Service` on any remote failure.
    async fn delete_snapshot(&self, snapshot_identifier: &str) -> Result<()>;
}

/// Produces a service client with credentials scoped to `account_id` in
/// `region`. Credentials live no longer than the run.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// # Errors
    ///
    /// `ReplicationError::Service` when credentials cannot be obtained.
    async fn client(&self, account_id: &str, region: &str) -> Result<Arc<dyn SnapshotService>>;
}
