#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use snapcopy_core::memory::MemoryCloud;
use snapcopy_core::{Snapshot, SnapshotStatus, SnapshotTime, TagSet};

pub const SOURCE_ACCOUNT: &str = "111111111111";
pub const DEST_ACCOUNT: &str = "222222222222";
pub const REGION: &str = "us-east-1";
pub const ENGINE: &str = "sqlserver-web";

/// Midnight UTC on 2024-01-`day`
pub fn day(day: u32) -> SnapshotTime {
    SnapshotTime::new(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap())
}

/// Tags of the production instance the default query looks for
pub fn prod_tags() -> TagSet {
    TagSet::new()
        .with("Environment", "prod")
        .with("Name", "prod-rds")
}

/// A source snapshot of `db-1` in the source account
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

/// An earlier copy of `source_id` at the destination, with optional provenance
pub fn existing_copy(
    cloud: &MemoryCloud,
    source_id: &str,
    instance_id: &str,
    provenance: Option<&str>,
) -> Snapshot {
    let tags = match provenance {
        Some(value) => TagSet::new().with("SourceSnapshotCreateTime", value),
        None => TagSet::new(),
    };
    cloud.add_snapshot(
        DEST_ACCOUNT,
        REGION,
        &format!("{source_id}-copied-from-{SOURCE_ACCOUNT}"),
        instance_id,
        SnapshotStatus::Available,
        day(1),
        tags,
    )
}
