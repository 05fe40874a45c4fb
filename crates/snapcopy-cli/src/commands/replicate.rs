//! Replication command

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use snapcopy_aws::AwsClientFactory;
use snapcopy_core::config::{
    DEFAULT_ENGINE, DEFAULT_ENVIRONMENT_TAG, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_NAME_TAG,
    DEFAULT_POLL_INTERVAL, ENV_FROM_ACCOUNT, ENV_FROM_REGION, ENV_STACK_NAME, ENV_TO_ACCOUNT,
    ENV_TO_REGION,
};
use snapcopy_core::{InstanceQuery, PollPolicy, RawConfig};
use snapcopy_engine::{run_replication, write_result_artifact, RunOptions, DEFAULT_ARTIFACT_NAME};

#[derive(Debug, Args)]
pub struct ReplicateArgs {
    /// Account holding the source instance
    #[arg(long, env = ENV_FROM_ACCOUNT)]
    pub from_account: Option<String>,

    #[arg(long, env = ENV_FROM_REGION)]
    pub from_region: Option<String>,

    /// Account receiving the copy
    #[arg(long, env = ENV_TO_ACCOUNT)]
    pub to_account: Option<String>,

    #[arg(long, env = ENV_TO_REGION)]
    pub to_region: Option<String>,

    #[arg(long, env = ENV_STACK_NAME)]
    pub stack_name: Option<String>,

    #[arg(long, default_value = DEFAULT_ENGINE)]
    pub engine: String,

    /// Value of the instance's `Environment` tag
    #[arg(long, default_value = DEFAULT_ENVIRONMENT_TAG)]
    pub environment_tag: String,

    /// Value of the instance's `Name` tag
    #[arg(long, default_value = DEFAULT_NAME_TAG)]
    pub name_tag: String,

    /// Where to write the destination snapshot identifier
    #[arg(long, default_value = DEFAULT_ARTIFACT_NAME)]
    pub output: PathBuf,

    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub poll_interval_secs: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_POLL_ATTEMPTS)]
    pub max_poll_attempts: u32,

    /// Delete stale copies that block the destination name
    #[arg(long)]
    pub prune_stale: bool,

    /// Decide only; make no changes and write no output file
    #[arg(long)]
    pub dry_run: bool,

    /// JSON logs, and the run outcome as one JSON line on stdout
    #[arg(long)]
    pub log_json: bool,
}

impl ReplicateArgs {
    fn raw_config(&self) -> RawConfig {
        RawConfig {
            from_account: self.from_account.clone(),
            from_region: self.from_region.clone(),
            to_account: self.to_account.clone(),
            to_region: self.to_region.clone(),
            stack_name: self.stack_name.clone(),
            query: InstanceQuery {
                engine: self.engine.clone(),
                environment_tag: self.environment_tag.clone(),
                name_tag: self.name_tag.clone(),
            },
            poll: PollPolicy::new(
                Duration::from_secs(self.poll_interval_secs),
                self.max_poll_attempts,
            ),
            prune_stale: self.prune_stale,
        }
    }
}

/// Validate, run, then write the artifact (and the JSON outcome line)
///
/// # Errors
///
/// Any configuration, replication or artifact error.
pub async fn execute(args: ReplicateArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Validate before any credentials are touched
    let config = args.raw_config().validate()?;

    let factory = AwsClientFactory::from_env().await;
    let outcome = run_replication(
        &factory,
        &config,
        RunOptions {
            dry_run: args.dry_run,
        },
    )
    .await?;

    if outcome.is_final() {
        write_result_artifact(&args.output, &outcome)?;
    }

    if args.log_json {
        println!("{}", serde_json::to_string(&outcome)?);
    }

    Ok(())
}
