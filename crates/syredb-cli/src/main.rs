//! SyreDB CLI - terminal front-end for the client bootstrap
//!
//! Walks the configuration, database and session stages against a scripted
//! backend, the same way the desktop shell does on start-up.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "syredb")]
#[command(author, version, about = "SyreDB client bootstrap CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log filter, e.g. `info` or `syredb_core=debug` (or set SYREDB_LOG)
    #[arg(long, env = "SYREDB_LOG", global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bootstrap pipeline against a scenario
    Boot(commands::boot::BootArgs),

    /// Write and inspect scenario files
    Scenario {
        #[command(subcommand)]
        action: commands::scenario::ScenarioAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .format_timestamp(None)
        .init();

    // Create context for commands
    let ctx = commands::Context {
        format: cli.format,
        quiet: cli.quiet,
    };

    // Execute command
    match cli.command {
        Commands::Boot(args) => commands::boot::execute(&ctx, args).await,
        Commands::Scenario { action } => commands::scenario::execute(&ctx, action).await,
    }
}
