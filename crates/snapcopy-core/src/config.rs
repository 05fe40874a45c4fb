//! Run configuration
//!
//! Built once at startup from flags/environment and passed by reference into
//! every component. Nothing below the CLI reads the process environment.

use std::time::Duration;

use serde::Serialize;

use crate::errors::{ReplicationError, Result};

pub const ENV_FROM_ACCOUNT: &str = "FROM_ACCOUNT";
pub const ENV_FROM_REGION: &str = "FROM_REGION";
pub const ENV_TO_ACCOUNT: &str = "TO_ACCOUNT";
pub const ENV_TO_REGION: &str = "TO_REGION";
pub const ENV_STACK_NAME: &str = "STACK_NAME";

pub const DEFAULT_ENGINE: &str = "sqlserver-web";
pub const DEFAULT_ENVIRONMENT_TAG: &str = "prod";
pub const DEFAULT_NAME_TAG: &str = "prod-rds";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 720;

/// An account and the region the run operates in for that account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRegion {
    pub account_id: String,
    pub region: String,
}

impl AccountRegion {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }
}

/// Tag query identifying the source instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceQuery {
    pub engine: String,
    pub environment_tag: String,
    pub name_tag: String,
}

impl Default for InstanceQuery {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            environment_tag: DEFAULT_ENVIRONMENT_TAG.to_string(),
            name_tag: DEFAULT_NAME_TAG.to_string(),
        }
    }
}

/// Bounded polling: fixed interval, at most `max_attempts` status reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_POLL_ATTEMPTS)
    }
}

/// Validated configuration for one replication run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationConfig {
    pub source: AccountRegion,
    pub destination: AccountRegion,
    pub stack_name: String,
    pub query: InstanceQuery,
    pub poll: PollPolicy,
    /// Delete stale destination copies before re-copying. Off unless an
    /// operator asks for it.
    pub prune_stale: bool,
}

impl ReplicationConfig {
    /// Source and destination are the same account in the same region
    pub fn same_endpoint(&self) -> bool {
        self.source == self.destination
    }

    /// Region to hand the copy call when it crosses regions
    pub fn copy_source_region(&self) -> Option<&str> {
        (self.source.region != self.destination.region).then_some(self.source.region.as_str())
    }
}

/// Unvalidated inputs, as collected from flags or environment
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub from_account: Option<String>,
    pub from_region: Option<String>,
    pub to_account: Option<String>,
    pub to_region: Option<String>,
    pub stack_name: Option<String>,
    pub query: InstanceQuery,
    pub poll: PollPolicy,
    pub prune_stale: bool,
}

impl RawConfig {
    /// Validate into a `ReplicationConfig`
    ///
    /// # Errors
    ///
    /// `MissingConfig` naming the first absent (or blank) required variable,
    /// or `InvalidConfig` for a malformed account id or a zero attempt budget.
    pub fn validate(self) -> Result<ReplicationConfig> {
        let from_account = required(ENV_FROM_ACCOUNT, self.from_account)?;
        let from_region = required(ENV_FROM_REGION, self.from_region)?;
        let to_account = required(ENV_TO_ACCOUNT, self.to_account)?;
        let to_region = required(ENV_TO_REGION, self.to_region)?;
        let stack_name = required(ENV_STACK_NAME, self.stack_name)?;

        check_account_id(ENV_FROM_ACCOUNT, &from_account)?;
        check_account_id(ENV_TO_ACCOUNT, &to_account)?;

        if self.poll.max_attempts == 0 {
            return Err(ReplicationError::InvalidConfig {
                name: "max_poll_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(ReplicationConfig {
            source: AccountRegion::new(from_account, from_region),
            destination: AccountRegion::new(to_account, to_region),
            stack_name,
            query: self.query,
            poll: self.poll,
            prune_stale: self.prune_stale,
        })
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ReplicationError::MissingConfig {
            name: name.to_string(),
        }),
    }
}

fn check_account_id(name: &str, value: &str) -> Result<()> {
    if value.len() == 12 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ReplicationError::InvalidConfig {
            name: name.to_string(),
            reason: format!("'{value}' is not a 12-digit account id"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> RawConfig {
        RawConfig {
            from_account: Some("111111111111".to_string()),
            from_region: Some("us-east-1".to_string()),
            to_account: Some("222222222222".to_string()),
            to_region: Some("us-west-2".to_string()),
            stack_name: Some("dev".to_string()),
            ..RawConfig::default()
        }
    }

    #[test]
    fn test_complete_config_validates_with_defaults() {
        let config = complete().validate().unwrap();
        assert_eq!(config.query.engine, DEFAULT_ENGINE);
        assert_eq!(config.poll, PollPolicy::default());
        assert!(!config.prune_stale);
        assert!(!config.same_endpoint());
        assert_eq!(config.copy_source_region(), Some("us-east-1"));
    }

    #[test]
    fn test_missing_value_names_variable() {
        let raw = RawConfig {
            to_region: None,
            ..complete()
        };
        assert_eq!(
            raw.validate().unwrap_err(),
            ReplicationError::MissingConfig {
                name: ENV_TO_REGION.to_string()
            }
        );
    }

    #[test]
    fn test_blank_value_is_missing() {
        let raw = RawConfig {
            stack_name: Some("  ".to_string()),
            ..complete()
        };
        assert!(matches!(
            raw.validate(),
            Err(ReplicationError::MissingConfig { name }) if name == ENV_STACK_NAME
        ));
    }

    #[test]
    fn test_malformed_account_rejected() {
        let raw = RawConfig {
            from_account: Some("12345".to_string()),
            ..complete()
        };
        assert!(matches!(
            raw.validate(),
            Err(ReplicationError::InvalidConfig { name, .. }) if name == ENV_FROM_ACCOUNT
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let raw = RawConfig {
            poll: PollPolicy::new(DEFAULT_POLL_INTERVAL, 0),
            ..complete()
        };
        assert!(matches!(
            raw.validate(),
            Err(ReplicationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_same_region_has_no_copy_source_region() {
        let raw = RawConfig {
            to_region: Some("us-east-1".to_string()),
            ..complete()
        };
        assert_eq!(raw.validate().unwrap().copy_source_region(), None);
    }
}
