mod commands;

use clap::{Parser, Subcommand};
use commands::{ControlCommands, check_config, handle_control_command};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pacer")]
#[command(about = "Pacer CLI - inspect configs and steer a running daemon")]
struct Cli {
    /// Address of the daemon's control socket
    #[arg(long, global = true, default_value = "127.0.0.1:7400")]
    control: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and print its routes
    Check {
        /// Path to the TOML configuration
        #[arg(long, short, default_value = "/etc/pacer/pacer.toml")]
        config: PathBuf,
    },
    /// Send a control message to the daemon
    #[command(subcommand)]
    Control(ControlCommands),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check { config }) => {
            check_config(&config)?;
        }
        Some(Commands::Control(cmd)) => {
            handle_control_command(&cli.control, cmd).await?;
        }
        None => {
            println!("Pacer CLI ready. Control address: {}", cli.control);
            println!("Use --help for usage information.");
        }
    }

    Ok(())
}
