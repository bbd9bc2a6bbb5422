use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use collins::commands;
use collins::config::{Conventions, LogLevel};
use collins::logging;

#[derive(Parser, Debug)]
#[command(name = "collins")]
#[command(about = "Validate a Collins configuration directory", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Check the master config and resolve every gear config in a directory
    Check {
        /// Configuration directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Configuration file extension (json, toml, yaml)
        #[arg(long, default_value = "json")]
        extension: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    logging::init_tracing(level, args.json_logs);

    match args.command {
        Command::Check { dir, extension } => {
            let conventions = Conventions::with_extension(extension)?;
            match commands::run_config_check(&dir, conventions).await {
                Ok(report) => {
                    info!(
                        "{} gear config(s) resolved, {} skipped",
                        report.resolved.len(),
                        report.skipped.len()
                    );
                    Ok(())
                }
                Err(e) => {
                    error!("Configuration check failed: {}", e);
                    Err(e.into())
                }
            }
        }
    }
}
