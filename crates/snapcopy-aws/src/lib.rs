//! AWS implementation of the snapshot capability traits
//!
//! `AwsClientFactory` assumes the fixed deployment role in each target
//! account; `RdsSnapshotService` maps every `SnapshotService` call onto the
//! RDS API.

pub mod credentials;
pub mod rds;

pub use credentials::{role_arn, AwsClientFactory, ROLE_NAME, SESSION_LENGTH, SESSION_NAME};
pub use rds::RdsSnapshotService;
