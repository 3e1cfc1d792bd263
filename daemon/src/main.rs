mod daemon;
mod egress;
mod error;
mod ingress;

use clap::{Parser, Subcommand};
use daemon::{Daemon, shutdown_signal};
use pacer_engine::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pacerd")]
#[command(about = "Pacer packet buffering daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start buffering and forwarding packets
    Start {
        /// Path to the TOML configuration
        #[arg(long, short, default_value = "/etc/pacer/pacer.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => {
            let config = Config::load(&config)?;
            let daemon = Daemon::bind(&config).await?;

            tracing::info!(
                routes = config.routes.len(),
                control = ?daemon.control_addr(),
                "Starting pacer daemon"
            );

            let stats = daemon.run_until(shutdown_signal()).await;
            tracing::info!("Final stats: {}", serde_json::to_string(&stats)?);
        }
    }

    Ok(())
}
