mod api;
mod cli;
mod db;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fixturesync")]
#[command(about = "Aggregates sports fixtures, odds and live scores into one catalog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Run a full fixture sync across the configured leagues
    Sync {
        /// Target date (YYYY-MM-DD), defaults to the provider's window
        #[arg(short, long)]
        date: Option<String>,
        /// Hand newly created fixtures to the analysis collaborator
        #[arg(short, long)]
        analyze: bool,
    },
    /// Refresh live scores on known fixtures
    Live,
    /// Initialize the database
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    dotenv::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting fixturesync API server on port {}", port);
            api::serve(port).await?;
        }
        Some(Commands::Sync { date, analyze }) => {
            cli::run_sync(date, analyze).await?;
        }
        Some(Commands::Live) => {
            cli::run_live().await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            db::init_database().await?;
        }
        None => {
            tracing::info!("Starting fixturesync API server on port 3000");
            api::serve(3000).await?;
        }
    }

    Ok(())
}
