//! In-memory snapshot service
//!
//! `MemoryCloud` holds any number of (account, region) endpoints and hands
//! out `MemorySnapshotService` views onto them through `ClientFactory`.
//! Cross-account copies resolve the source by ARN and require that restore
//! permission was granted first, the same precondition the real service
//! enforces. Every call is journaled for assertions.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::{ReplicationError, Result};
use crate::model::{DatabaseInstance, Snapshot, SnapshotStatus, SnapshotTime, TagSet};
use crate::service::{ClientFactory, CopyRequest, SnapshotService};

/// One journaled service call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    ListInstances,
    ListTags { arn: String },
    ListManualSnapshots { instance_identifier: Option<String> },
    DescribeSnapshot { snapshot_identifier: String },
    RestoreAccounts { snapshot_identifier: String },
    GrantRestore { snapshot_identifier: String, account_id: String },
    CopySnapshot(CopyRequest),
    AddTags { arn: String, tags: TagSet },
    DeleteSnapshot { snapshot_identifier: String },
}

impl ServiceCall {
    /// Name used by `MemoryCloud::fail_on`
    pub fn op(&self) -> &'static str {
        match self {
            ServiceCall::ListInstances => "list_instances",
            ServiceCall::ListTags { .. } => "list_tags",
            ServiceCall::ListManualSnapshots { .. } => "list_manual_snapshots",
            ServiceCall::DescribeSnapshot { .. } => "describe_snapshot",
            ServiceCall::RestoreAccounts { .. } => "restore_accounts",
            ServiceCall::GrantRestore { .. } => "grant_restore",
            ServiceCall::CopySnapshot(_) => "copy_snapshot",
            ServiceCall::AddTags { .. } => "add_tags",
            ServiceCall::DeleteSnapshot { .. } => "delete_snapshot",
        }
    }

    /// True for calls that change remote state
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ServiceCall::GrantRestore { .. }
                | ServiceCall::CopySnapshot(_)
                | ServiceCall::AddTags { .. }
                | ServiceCall::DeleteSnapshot { .. }
        )
    }
}

/// A journaled call together with the endpoint it was made against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub account_id: String,
    pub region: String,
    pub call: ServiceCall,
}

type Endpoint = (String, String);

#[derive(Default)]
struct EndpointState {
    instances: Vec<DatabaseInstance>,
    snapshots: Vec<Snapshot>,
    restore: HashMap<String, BTreeSet<String>>,
    /// Statuses still to be reported for copies in progress; the last one sticks
    progress: HashMap<String, VecDeque<SnapshotStatus>>,
}

#[derive(Default)]
struct World {
    endpoints: HashMap<Endpoint, EndpointState>,
    tags: HashMap<String, TagSet>,
    copy_script: Vec<SnapshotStatus>,
    failures: HashMap<&'static str, String>,
    calls: Vec<CallRecord>,
    connections: Vec<Endpoint>,
}

impl World {
    fn endpoint(&mut self, account_id: &str, region: &str) -> &mut EndpointState {
        self.endpoints
            .entry((account_id.to_string(), region.to_string()))
            .or_default()
    }

    fn find_by_arn(&self, arn: &str) -> Option<(&Endpoint, &Snapshot)> {
        self.endpoints.iter().find_map(|(endpoint, state)| {
            state
                .snapshots
                .iter()
                .find(|s| s.arn == arn)
                .map(|s| (endpoint, s))
        })
    }
}

fn instance_arn(account_id: &str, region: &str, identifier: &str) -> String {
    format!("arn:aws:rds:{region}:{account_id}:db:{identifier}")
}

fn snapshot_arn(account_id: &str, region: &str, identifier: &str) -> String {
    format!("arn:aws:rds:{region}:{account_id}:snapshot:{identifier}")
}

/// Shared in-memory world; cheap to clone
#[derive(Clone, Default)]
pub struct MemoryCloud {
    world: Arc<Mutex<World>>,
}

impl MemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an instance and its tags
    pub fn add_instance(
        &self,
        account_id: &str,
        region: &str,
        identifier: &str,
        engine: &str,
        tags: TagSet,
    ) -> DatabaseInstance {
        let instance = DatabaseInstance::new(
            identifier,
            engine,
            instance_arn(account_id, region, identifier),
        );
        let mut world = self.lock();
        if !tags.is_empty() {
            world.tags.insert(instance.arn.clone(), tags);
        }
        world
            .endpoint(account_id, region)
            .instances
            .push(instance.clone());
        instance
    }

    /// Register a manual snapshot and its tags
    #[allow(clippy::too_many_arguments)]
    pub fn add_snapshot(
        &self,
        account_id: &str,
        region: &str,
        identifier: &str,
        instance_identifier: &str,
        status: SnapshotStatus,
        created_at: SnapshotTime,
        tags: TagSet,
    ) -> Snapshot {
        let snapshot = Snapshot {
            identifier: identifier.to_string(),
            instance_identifier: instance_identifier.to_string(),
            arn: snapshot_arn(account_id, region, identifier),
            status,
            created_at,
        };
        let mut world = self.lock();
        if !tags.is_empty() {
            world.tags.insert(snapshot.arn.clone(), tags);
        }
        world
            .endpoint(account_id, region)
            .snapshots
            .push(snapshot.clone());
        snapshot
    }

    /// Statuses that `describe_snapshot` reports, in order, for every copy
    /// started afterwards. Defaults to immediately `available`.
    pub fn script_copy_statuses(&self, statuses: Vec<SnapshotStatus>) {
        self.lock().copy_script = statuses;
    }

    /// Make every call of `op` fail with a service error
    pub fn fail_on(&self, op: &'static str, message: &str) {
        self.lock().failures.insert(op, message.to_string());
    }

    /// Service view for one endpoint, without going through the factory
    pub fn service(&self, account_id: &str, region: &str) -> MemorySnapshotService {
        MemorySnapshotService {
            cloud: self.clone(),
            account_id: account_id.to_string(),
            region: region.to_string(),
        }
    }

    pub fn snapshot(&self, account_id: &str, region: &str, identifier: &str) -> Option<Snapshot> {
        self.lock()
            .endpoint(account_id, region)
            .snapshots
            .iter()
            .find(|s| s.identifier == identifier)
            .cloned()
    }

    pub fn snapshots(&self, account_id: &str, region: &str) -> Vec<Snapshot> {
        self.lock().endpoint(account_id, region).snapshots.clone()
    }

    pub fn tags(&self, arn: &str) -> TagSet {
        self.lock().tags.get(arn).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<CallRecord> {
        self.calls()
            .into_iter()
            .filter(|r| r.call.is_mutating())
            .collect()
    }

    /// Count journaled calls with the given op name
    pub fn count(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|r| r.call.op() == op).count()
    }

    /// Endpoints requested through `ClientFactory`, in order
    pub fn connections(&self) -> Vec<(String, String)> {
        self.lock().connections.clone()
    }
}

#[async_trait]
impl ClientFactory for MemoryCloud {
    async fn client(&self, account_id: &str, region: &str) -> Result<Arc<dyn SnapshotService>> {
        {
            let mut world = self.lock();
            world
                .connections
                .push((account_id.to_string(), region.to_string()));
            if let Some(message) = world.failures.get("client") {
                return Err(ReplicationError::service("client", message.clone()));
            }
        }
        Ok(Arc::new(self.service(account_id, region)))
    }
}

/// One (account, region) endpoint of a `MemoryCloud`
#[derive(Clone)]
pub struct MemorySnapshotService {
    cloud: MemoryCloud,
    account_id: String,
    region: String,
}

impl MemorySnapshotService {
    /// Journal the call and apply any injected failure
    fn record(&self, world: &mut World, call: ServiceCall) -> Result<()> {
        let op = call.op();
        world.calls.push(CallRecord {
            account_id: self.account_id.clone(),
            region: self.region.clone(),
            call,
        });
        match world.failures.get(op) {
            Some(message) => Err(ReplicationError::service(op, message.clone())),
            None => Ok(()),
        }
    }

    fn not_found(op: &str, identifier: &str) -> ReplicationError {
        ReplicationError::service(op, format!("DBSnapshotNotFound: {identifier}"))
    }
}

#[async_trait]
impl SnapshotService for MemorySnapshotService {
    async fn list_instances(&self) -> Result<Vec<DatabaseInstance>> {
        let mut world = self.cloud.lock();
        self.record(&mut world, ServiceCall::ListInstances)?;
        Ok(world
            .endpoint(&self.account_id, &self.region)
            .instances
            .clone())
    }

    async fn list_tags(&self, arn: &str) -> Result<TagSet> {
        let mut world = self.cloud.lock();
        self.record(
            &mut world,
            ServiceCall::ListTags {
                arn: arn.to_string(),
            },
        )?;
        Ok(world.tags.get(arn).cloned().unwrap_or_default())
    }

    async fn list_manual_snapshots(
        &self,
        instance_identifier: Option<&str>,
    ) -> Result<Vec<Snapshot>> {
        let mut world = self.cloud.lock();
        self.record(
            &mut world,
            ServiceCall::ListManualSnapshots {
                instance_identifier: instance_identifier.map(str::to_string),
            },
        )?;
        Ok(world
            .endpoint(&self.account_id, &self.region)
            .snapshots
            .iter()
            .filter(|s| instance_identifier.map_or(true, |id| s.instance_identifier == id))
            .cloned()
            .collect())
    }

    async fn describe_snapshot(&self, snapshot_identifier: &str) -> Result<Option<Snapshot>> {
        let mut world = self.cloud.lock();
        self.record(
            &mut world,
            ServiceCall::DescribeSnapshot {
                snapshot_identifier: snapshot_identifier.to_string(),
            },
        )?;
        let state = world.endpoint(&self.account_id, &self.region);
        if let Some(queue) = state.progress.get_mut(snapshot_identifier) {
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if let Some(status) = next {
                if let Some(snapshot) = state
                    .snapshots
                    .iter_mut()
                    .find(|s| s.identifier == snapshot_identifier)
                {
                    snapshot.status = status;
                }
            }
        }
        Ok(state
            .snapshots
            .iter()
            .find(|s| s.identifier == snapshot_identifier)
            .cloned())
    }

    async fn restore_accounts(&self, snapshot_identifier: &str) -> Result<Vec<String>> {
        let mut world = self.cloud.lock();
        self.record(
            &mut world,
            ServiceCall::RestoreAccounts {
                snapshot_identifier: snapshot_identifier.to_string(),
            },
        )?;
        let state = world.endpoint(&self.account_id, &self.region);
        if !state
            .snapshots
            .iter()
            .any(|s| s.identifier == snapshot_identifier)
        {
            return Err(Self::not_found("restore_accounts", snapshot_identifier));
        }
        Ok(state
            .restore
            .get(snapshot_identifier)
            .map(|accounts| accounts.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn grant_restore(&self, snapshot_identifier: &str, account_id: &str) -> Result<()> {
        let mut world = self.cloud.lock();
        self.record(
            &mut world,
            ServiceCall::GrantRestore {
                snapshot_identifier: snapshot_identifier.to_string(),
                account_id: account_id.to_string(),
            },
        )?;
        let state = world.endpoint(&self.account_id, &self.region);
        if !state
            .snapshots
            .iter()
            .any(|s| s.identifier == snapshot_identifier)
        {
            return Err(Self::not_found("grant_restore", snapshot_identifier));
        }
        state
            .restore
            .entry(snapshot_identifier.to_string())
            .or_default()
            .insert(account_id.to_string());
        Ok(())
    }

    async fn copy_snapshot(&self, request: &CopyRequest) -> Result<Snapshot> {
        let mut world = self.cloud.lock();
        self.record(&mut world, ServiceCall::CopySnapshot(request.clone()))?;

        let ((source_account, source_region), source) = world
            .find_by_arn(&request.source_arn)
            .map(|(endpoint, snapshot)| (endpoint.clone(), snapshot.clone()))
            .ok_or_else(|| Self::not_found("copy_snapshot", &request.source_arn))?;

        if source_account != self.account_id {
            let shared = world
                .endpoint(&source_account, &source_region)
                .restore
                .get(&source.identifier)
                .is_some_and(|accounts| accounts.contains(&self.account_id));
            if !shared {
                return Err(ReplicationError::service(
                    "copy_snapshot",
                    format!(
                        "AccessDenied: {} is not shared with {}",
                        source.identifier, self.account_id
                    ),
                ));
            }
        }

        let script: VecDeque<SnapshotStatus> = if world.copy_script.is_empty() {
            VecDeque::from([SnapshotStatus::Available])
        } else {
            world.copy_script.iter().cloned().collect()
        };

        let state = world.endpoint(&self.account_id, &self.region);
        if state
            .snapshots
            .iter()
            .any(|s| s.identifier == request.target_identifier)
        {
            return Err(ReplicationError::service(
                "copy_snapshot",
                format!("DBSnapshotAlreadyExists: {}", request.target_identifier),
            ));
        }

        let copy = Snapshot {
            identifier: request.target_identifier.clone(),
            instance_identifier: source.instance_identifier,
            arn: snapshot_arn(&self.account_id, &self.region, &request.target_identifier),
            status: SnapshotStatus::Creating,
            created_at: SnapshotTime::new(Utc::now()),
        };
        state.snapshots.push(copy.clone());
        state
            .progress
            .insert(request.target_identifier.clone(), script);
        Ok(copy)
    }

    async fn add_tags(&self, arn: &str, tags: &TagSet) -> Result<()> {
        let mut world = self.cloud.lock();
        self.record(
            &mut world,
            ServiceCall::AddTags {
                arn: arn.to_string(),
                tags: tags.clone(),
            },
        )?;
        world
            .tags
            .entry(arn.to_string())
            .or_default()
            .extend(tags.clone());
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_identifier: &str) -> Result<()> {
        let mut world = self.cloud.lock();
        self.record(
            &mut world,
            ServiceCall::DeleteSnapshot {
                snapshot_identifier: snapshot_identifier.to_string(),
            },
        )?;
        let state = world.endpoint(&self.account_id, &self.region);
        let before = state.snapshots.len();
        state
            .snapshots
            .retain(|s| s.identifier != snapshot_identifier);
        if state.snapshots.len() == before {
            return Err(Self::not_found("delete_snapshot", snapshot_identifier));
        }
        state.progress.remove(snapshot_identifier);
        state.restore.remove(snapshot_identifier);
        let arn = snapshot_arn(&self.account_id, &self.region, snapshot_identifier);
        world.tags.remove(&arn);
        Ok(())
    }
}
