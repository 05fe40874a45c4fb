//! Per-account credentials through STS assume-role

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use snapcopy_core::errors::Result;
use snapcopy_core::{ClientFactory, SnapshotService};

use crate::rds::RdsSnapshotService;

/// Role assumed in every account the tool touches
pub const ROLE_NAME: &str = "ciinabox";
pub const SESSION_NAME: &str = "copy-rds-snapshot";
/// One session covers a whole run, polling included
pub const SESSION_LENGTH: Duration = Duration::from_secs(900);

pub fn role_arn(account_id: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/{ROLE_NAME}")
}

/// Builds RDS clients with credentials of the deployment role in the
/// requested account. The base credentials come from the default chain.
#[derive(Clone)]
pub struct AwsClientFactory {
    base: SdkConfig,
}

impl AwsClientFactory {
    /// Load base credentials from the environment / default provider chain
    pub async fn from_env() -> Self {
        let base = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self { base }
    }

    async fn assumed_config(&self, account_id: &str, region: &str) -> SdkConfig {
        let region = Region::new(region.to_string());
        let provider = AssumeRoleProvider::builder(role_arn(account_id))
            .session_name(SESSION_NAME)
            .session_length(SESSION_LENGTH)
            .region(region.clone())
            .configure(&self.base)
            .build()
            .await;

        aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(provider)
            .load()
            .await
    }
}

#[async_trait]
impl ClientFactory for AwsClientFactory {
    async fn client(&self, account_id: &str, region: &str) -> Result<Arc<dyn SnapshotService>> {
        tracing::debug!(
            account_id = %account_id,
            region = %region,
            role = %role_arn(account_id),
            "assuming role"
        );
        let config = self.assumed_config(account_id, region).await;
        Ok(Arc::new(RdsSnapshotService::new(aws_sdk_rds::Client::new(
            &config,
        ))))
    }
}
