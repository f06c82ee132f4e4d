//! Meshtalk daemon - headless driver for mesh chat nodes.
//!
//! This binary:
//! - Simulates a mesh of in-process nodes and prints their conversations
//! - Shows and edits the node configuration
//! - Reports where configuration and received files live

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// Meshtalk - serverless local mesh chat
#[derive(Parser)]
#[command(name = "meshtalk")]
#[command(about = "Headless driver for meshtalk nodes", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a line of in-process nodes and flood one message through it
    Simulate(commands::simulate::SimulateArgs),

    /// Show paths and configuration state
    Status,

    /// Show or modify configuration
    Config {
        /// Key to get or set
        key: Option<String>,
        /// Value to set
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Simulate(args) => commands::simulate::execute(args).await,
        Commands::Status => commands::status::execute().await,
        Commands::Config { key, value } => commands::config::execute(key, value).await,
    }
}
