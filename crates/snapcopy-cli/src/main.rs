//! snapcopy CLI
//!
//! Replicates the latest manual snapshot of a tagged database instance into
//! another account, then writes the destination identifier to a file for
//! the next pipeline stage.

use clap::Parser;
use snapcopy_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "snapcopy-cli")]
#[command(about = "Copy the latest manual RDS snapshot across accounts", long_about = None)]
struct Cli {
    #[command(flatten)]
    args: commands::replicate::ReplicateArgs,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init(if cli.args.log_json {
        Profile::Production
    } else {
        Profile::Development
    });

    if let Err(e) = commands::replicate::execute(cli.args).await {
        println!("ERROR: {}", e);
        std::process::exit(1);
    }
}
