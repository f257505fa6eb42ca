//! Meridian CLI - Database migrations, seeding, and scheduled jobs.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! meridian migrate
//!
//! # Seed the database with sample data
//! meridian seed
//!
//! # Run one job immediately
//! meridian job run cleanup
//!
//! # Run the scheduler loop (all jobs on their intervals)
//! meridian job schedule
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed database with sample data
//! - `job run <name>` - Run a single job once
//! - `job schedule` - Run all jobs on their schedules until interrupted

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod config;

use config::CrmConfig;

#[derive(Parser)]
#[command(name = "meridian")]
#[command(author, version, about = "Meridian CRM tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with sample customers, products, and orders
    Seed,
    /// Scheduled maintenance jobs
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
}

#[derive(Subcommand)]
enum JobAction {
    /// Run a single job once and exit
    Run {
        /// Which job to run
        #[arg(value_enum)]
        name: JobName,
    },
    /// Run every job on its interval until interrupted
    Schedule,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JobName {
    Heartbeat,
    Replenishment,
    Reminders,
    Cleanup,
    Report,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CrmConfig::from_env()?;
    match cli.command {
        Commands::Migrate => commands::migrate::run(&config).await?,
        Commands::Seed => commands::seed::run(&config).await?,
        Commands::Job { action } => match action {
            JobAction::Run { name } => commands::job::run_once(&config, name).await?,
            JobAction::Schedule => commands::job::schedule(&config).await?,
        },
    }
    Ok(())
}
