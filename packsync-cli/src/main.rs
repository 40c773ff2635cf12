//! PackSync CLI - command-line interface
//!
//! This binary provides a command-line interface to the PackSync library:
//! synchronize bundles, list what the server offers, launch the game, and
//! manage launcher configuration.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use commands::config::ConfigAction;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "packsync", version, about = "Keep game content bundles in sync")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Synchronize a bundle against the server manifest
    Sync {
        /// Bundle name (defaults to the configured bundle)
        #[arg(long)]
        bundle: Option<String>,
        /// Server base URL override
        #[arg(long)]
        server: Option<String>,
    },
    /// Synchronize, then launch the game
    Launch {
        /// Bundle name (defaults to the configured bundle)
        #[arg(long)]
        bundle: Option<String>,
        /// Server base URL override
        #[arg(long)]
        server: Option<String>,
    },
    /// List bundles available on the server
    Bundles {
        /// Server base URL override
        #[arg(long)]
        server: Option<String>,
    },
    /// Manage launcher configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Sync { bundle, server } => commands::sync::run(bundle, server).await,
        Command::Launch { bundle, server } => commands::launch::run(bundle, server).await,
        Command::Bundles { server } => commands::bundles::run(server).await,
        Command::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "packsync=debug" } else { "packsync=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
