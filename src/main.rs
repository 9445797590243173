use anyhow::Result;
use clap::{Parser, Subcommand};
use fxload::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Load exchange rates missing from the warehouse table (default)
    Sync {
        /// Fetch and display pending rows without loading them
        #[arg(long)]
        dry_run: bool,
    },
    /// Display the last stored date and the pending fetch window
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = cli.config_path.as_deref();
    let result = match cli.command {
        Some(Commands::Setup) => match config_path {
            Some(path) => fxload::cli::setup::setup_at_path(path),
            None => fxload::cli::setup::setup(),
        },
        Some(Commands::Sync { dry_run }) => {
            fxload::run_command(fxload::AppCommand::Sync { dry_run }, config_path).await
        }
        Some(Commands::Status) => fxload::run_command(fxload::AppCommand::Status, config_path).await,
        None => fxload::run_command(fxload::AppCommand::Sync { dry_run: false }, config_path).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
