mod cli;
mod config;
mod error;
mod logging;
mod models;
mod services;
mod storage;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::services::{FailurePolicy, Stage};

#[derive(Parser)]
#[command(name = "nfl-matchups")]
#[command(about = "Scrapes NFL schedules and team stats into weekly matchup rankings")]
struct Cli {
    /// Directory holding the stat files, outputs, log and backups
    #[arg(short, long, global = true, default_value = ".")]
    work_dir: PathBuf,

    /// Days to keep backups before they are removed
    #[arg(long, global = true, default_value = "30")]
    retention_days: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape this season's schedule
    Schedule,
    /// Scrape every team stat page
    Stats,
    /// Join the schedule with the stat sheets and write the outputs
    Matchup,
    /// Mirror the canonical output to Google Sheets
    Publish,
    /// Back up inputs, outputs and the log, then apply retention
    Backup,
    /// Render the run-log worksheet into dashboard.html
    Dashboard,
    /// Run every stage, record the run and send the notification email
    Run {
        /// Attempt the remaining stages after one fails
        #[arg(long)]
        keep_going: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env(cli.work_dir);
    config.retention_days = cli.retention_days;

    let _guard = logging::init_logging(config.log_dir())?;

    match cli.command {
        Some(Commands::Schedule) => cli::run_stage(config, Stage::Schedule).await?,
        Some(Commands::Stats) => cli::run_stage(config, Stage::Stats).await?,
        Some(Commands::Matchup) => cli::run_stage(config, Stage::Matchup).await?,
        Some(Commands::Publish) => cli::run_stage(config, Stage::Publish).await?,
        Some(Commands::Backup) => cli::run_stage(config, Stage::Backup).await?,
        Some(Commands::Dashboard) => cli::generate_dashboard(config).await?,
        Some(Commands::Run { keep_going }) => {
            let policy = if keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            };
            cli::run_pipeline(config, policy).await?;
        }
        None => {
            // Default to the guarded full run
            cli::run_pipeline(config, FailurePolicy::Abort).await?;
        }
    }

    Ok(())
}
