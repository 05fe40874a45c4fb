#![allow(dead_code)]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use snapcopy_core::memory::MemoryCloud;
use snapcopy_core::{
    AccountRegion, InstanceQuery, PollPolicy, ReplicationConfig, Snapshot, SnapshotStatus,
    SnapshotTime, TagSet,
};

pub const SOURCE_ACCOUNT: &str = "111111111111";
pub const DEST_ACCOUNT: &str = "222222222222";
pub const REGION: &str = "us-east-1";
pub const DEST_REGION: &str = "eu-west-1";
pub const ENGINE: &str = "sqlserver-web";

/// Midnight UTC on 2024-01-`day`
pub fn day(day: u32) -> SnapshotTime {
    SnapshotTime::new(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap())
}

/// Cross-account, same-region config with a zero poll interval
pub fn config() -> ReplicationConfig {
    ReplicationConfig {
        source: AccountRegion::new(SOURCE_ACCOUNT, REGION),
        destination: AccountRegion::new(DEST_ACCOUNT, REGION),
        stack_name: "nightly-refresh".to_string(),
        query: InstanceQuery::default(),
        poll: PollPolicy::new(Duration::ZERO, 5),
        prune_stale: false,
    }
}

/// Source account with `db-1` tagged prod/prod-rds
pub fn seeded_cloud() -> MemoryCloud {
    let cloud = MemoryCloud::new();
    cloud.add_instance(
        SOURCE_ACCOUNT,
        REGION,
        "db-1",
        ENGINE,
        TagSet::new()
            .with("Environment", "prod")
            .with("Name", "prod-rds"),
    );
    cloud
}

/// An available manual snapshot of `db-1` in the source account
pub fn source_snapshot(cloud: &MemoryCloud, id: &str, created: SnapshotTime) -> Snapshot {
    cloud.add_snapshot(
        SOURCE_ACCOUNT,
        REGION,
        id,
        "db-1",
        SnapshotStatus::Available,
        created,
        TagSet::new(),
    )
}

/// An earlier destination copy of `source_id` recording `provenance`
pub fn existing_copy(cloud: &MemoryCloud, source_id: &str, provenance: SnapshotTime) -> Snapshot {
    cloud.add_snapshot(
        DEST_ACCOUNT,
        REGION,
        &format!("{source_id}-copied-from-{SOURCE_ACCOUNT}"),
        "db-1",
        SnapshotStatus::Available,
        provenance,
        TagSet::new().with("SourceSnapshotCreateTime", provenance.canonical()),
    )
}
