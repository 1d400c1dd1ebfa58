mod commands;
mod config;
mod services;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "treewright")]
#[command(about = "Chat assistant for building validated targeting trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Keep everything in process memory instead of PostgreSQL
        #[arg(long)]
        in_memory: bool,
        /// Do not start the periodic segment sync
        #[arg(long)]
        no_scheduler: bool,
    },
    /// Run one segment and attribute sync
    Sync,
    /// Print the sync status
    Status,
    /// List synced segment names
    Segments,
    /// List synced attributes
    Attributes,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host, in_memory, no_scheduler } => {
            commands::serve::run(port, host, in_memory, no_scheduler).await
        },
        Commands::Sync => commands::sync::run_sync().await,
        Commands::Status => commands::sync::run_status().await,
        Commands::Segments => commands::catalog::run_segments().await,
        Commands::Attributes => commands::catalog::run_attributes().await,
    }
}
