use serde::{Deserialize, Serialize};

/// A database instance as seen through the listing capability
///
/// Owned externally; this crate only reads it. The tag set is fetched
/// separately through `SnapshotService::list_tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub identifier: String,
    pub engine: String,
    pub arn: String,
}

impl DatabaseInstance {
    pub fn new(
        identifier: impl Into<String>,
        engine: impl Into<String>,
        arn: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            engine: engine.into(),
            arn: arn.into(),
        }
    }
}
