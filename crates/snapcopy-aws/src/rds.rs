//! RDS-backed `SnapshotService`

use std::error::Error as StdError;

use async_trait::async_trait;
use aws_sdk_rds::error::DisplayErrorContext;
use aws_sdk_rds::types::{DbInstance, DbSnapshot, Tag};
use snapcopy_core::errors::{ReplicationError, Result};
use snapcopy_core::{
    CopyRequest, DatabaseInstance, Snapshot, SnapshotService, SnapshotStatus, SnapshotTime, TagSet,
};

/// Attribute that lists accounts allowed to restore a manual snapshot
const RESTORE_ATTRIBUTE: &str = "restore";
const MANUAL_SNAPSHOT_TYPE: &str = "manual";

pub struct RdsSnapshotService {
    client: aws_sdk_rds::Client,
}

impl RdsSnapshotService {
    pub fn new(client: aws_sdk_rds::Client) -> Self {
        Self { client }
    }
}

fn service_error<E: StdError + 'static>(op: &str, err: E) -> ReplicationError {
    ReplicationError::service(op, DisplayErrorContext(err).to_string())
}

fn to_instance(instance: &DbInstance) -> DatabaseInstance {
    DatabaseInstance::new(
        instance.db_instance_identifier().unwrap_or_default(),
        instance.engine().unwrap_or_default(),
        instance.db_instance_arn().unwrap_or_default(),
    )
}

fn to_snapshot(snapshot: &DbSnapshot) -> Snapshot {
    // In-progress snapshots may not report a creation time yet
    let created_at = snapshot
        .snapshot_create_time()
        .and_then(|t| SnapshotTime::from_unix(t.secs(), t.subsec_nanos()))
        .unwrap_or_else(|| SnapshotTime::new(chrono::DateTime::default()));
    Snapshot {
        identifier: snapshot
            .db_snapshot_identifier()
            .unwrap_or_default()
            .to_string(),
        instance_identifier: snapshot
            .db_instance_identifier()
            .unwrap_or_default()
            .to_string(),
        arn: snapshot.db_snapshot_arn().unwrap_or_default().to_string(),
        status: SnapshotStatus::parse(snapshot.status().unwrap_or_default()),
        created_at,
    }
}

fn to_tag_set(tags: &[Tag]) -> TagSet {
    tags.iter()
        .filter_map(|t| Some((t.key()?.to_string(), t.value().unwrap_or_default().to_string())))
        .collect()
}

#[async_trait]
impl SnapshotService for RdsSnapshotService {
    async fn list_instances(&self) -> Result<Vec<DatabaseInstance>> {
        let mut instances = Vec::new();
        let mut marker = None;
        loop {
            let page = self
                .client
                .describe_db_instances()
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| service_error("list_instances", e))?;
            instances.extend(page.db_instances().iter().map(to_instance));
            marker = page.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(instances)
    }

    async fn list_tags(&self, arn: &str) -> Result<TagSet> {
        let output = self
            .client
            .list_tags_for_resource()
            .resource_name(arn)
            .send()
            .await
            .map_err(|e| service_error("list_tags", e))?;
        Ok(to_tag_set(output.tag_list()))
    }

    async fn list_manual_snapshots(
        &self,
        instance_identifier: Option<&str>,
    ) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        let mut marker = None;
        loop {
            let page = self
                .client
                .describe_db_snapshots()
                .set_db_instance_identifier(instance_identifier.map(str::to_string))
                .snapshot_type(MANUAL_SNAPSHOT_TYPE)
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| service_error("list_manual_snapshots", e))?;
            snapshots.extend(page.db_snapshots().iter().map(to_snapshot));
            marker = page.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(snapshots)
    }

    async fn describe_snapshot(&self, snapshot_identifier: &str) -> Result<Option<Snapshot>> {
        match self
            .client
            .describe_db_snapshots()
            .db_snapshot_identifier(snapshot_identifier)
            .send()
            .await
        {
            Ok(output) => Ok(output.db_snapshots().first().map(to_snapshot)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_snapshot_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(err) => Err(service_error("describe_snapshot", err)),
        }
    }

    async fn restore_accounts(&self, snapshot_identifier: &str) -> Result<Vec<String>> {
        let output = self
            .client
            .describe_db_snapshot_attributes()
            .db_snapshot_identifier(snapshot_identifier)
            .send()
            .await
            .map_err(|e| service_error("restore_accounts", e))?;
        Ok(output
            .db_snapshot_attributes_result()
            .map(|result| {
                result
                    .db_snapshot_attributes()
                    .iter()
                    .filter(|a| a.attribute_name() == Some(RESTORE_ATTRIBUTE))
                    .flat_map(|a| a.attribute_values().iter().cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn grant_restore(&self, snapshot_identifier: &str, account_id: &str) -> Result<()> {
        self.client
            .modify_db_snapshot_attribute()
            .db_snapshot_identifier(snapshot_identifier)
            .attribute_name(RESTORE_ATTRIBUTE)
            .values_to_add(account_id)
            .send()
            .await
            .map_err(|e| service_error("grant_restore", e))?;
        Ok(())
    }

    async fn copy_snapshot(&self, request: &CopyRequest) -> Result<Snapshot> {
        let output = self
            .client
            .copy_db_snapshot()
            .source_db_snapshot_identifier(&request.source_arn)
            .target_db_snapshot_identifier(&request.target_identifier)
            .set_source_region(request.source_region.clone())
            .send()
            .await
            .map_err(|e| service_error("copy_snapshot", e))?;
        output.db_snapshot().map(to_snapshot).ok_or_else(|| {
            ReplicationError::service("copy_snapshot", "response carried no snapshot")
        })
    }

    async fn add_tags(&self, arn: &str, tags: &TagSet) -> Result<()> {
        let tags = tags
            .iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect();
        self.client
            .add_tags_to_resource()
            .resource_name(arn)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| service_error("add_tags", e))?;
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_identifier: &str) -> Result<()> {
        self.client
            .delete_db_snapshot()
            .db_snapshot_identifier(snapshot_identifier)
            .send()
            .await
            .map_err(|e| service_error("delete_snapshot", e))?;
        Ok(())
    }
}
