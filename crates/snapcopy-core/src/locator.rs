//! Instance Locator
//!
//! Finds the source database instance by engine and by its `Environment`
//! and `Name` tags.

use std::time::Instant;

use crate::config::InstanceQuery;
use crate::errors::{ReplicationError, Result};
use crate::service::SnapshotService;
use crate::{log_op_end, log_op_error, log_op_start};

pub const ENVIRONMENT_TAG_KEY: &str = "Environment";
pub const NAME_TAG_KEY: &str = "Name";

/// Identifier of the unique instance matching `query`
///
/// Instances are filtered on exact engine first; tags are fetched only for
/// those candidates, and candidates without tags are skipped.
///
/// # Errors
///
/// - `InstanceNotFound` when nothing matches (an expected outcome, not a
///   transport failure)
/// - `AmbiguousInstance` when more than one instance matches
/// - `Service` for remote failures
pub async fn find_instance(
    client: &dyn SnapshotService,
    query: &InstanceQuery,
) -> Result<String> {
    let start = Instant::now();
    log_op_start!(
        "find_instance",
        engine = %query.engine,
        environment_tag = %query.environment_tag,
        name_tag = %query.name_tag
    );

    let result = locate(client, query).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(instance_id) => {
            log_op_end!(
                "find_instance",
                duration_ms = duration_ms,
                instance_id = %instance_id
            );
        }
        Err(err) => log_op_error!("find_instance", err, duration_ms = duration_ms),
    }
    result
}

async fn locate(client: &dyn SnapshotService, query: &InstanceQuery) -> Result<String> {
    let instances = client.list_instances().await?;

    let mut matches = Vec::new();
    for instance in instances.iter().filter(|i| i.engine == query.engine) {
        let tags = client.list_tags(&instance.arn).await?;
        if tags.is_empty() {
            tracing::debug!(instance_id = %instance.identifier, "skipping untagged instance");
            continue;
        }
        if tags.matches(ENVIRONMENT_TAG_KEY, &query.environment_tag)
            && tags.matches(NAME_TAG_KEY, &query.name_tag)
        {
            matches.push(instance.identifier.clone());
        }
    }

    match matches.len() {
        0 => Err(ReplicationError::InstanceNotFound {
            engine: query.engine.clone(),
            environment: query.environment_tag.clone(),
            name: query.name_tag.clone(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(ReplicationError::AmbiguousInstance {
            engine: query.engine.clone(),
            environment: query.environment_tag.clone(),
            name: query.name_tag.clone(),
            candidates: matches,
        }),
    }
}
