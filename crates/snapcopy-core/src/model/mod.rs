pub mod instance;
pub mod snapshot;
pub mod tags;
pub mod time;

pub use instance::DatabaseInstance;
pub use snapshot::{Snapshot, SnapshotStatus};
pub use tags::TagSet;
pub use time::SnapshotTime;
