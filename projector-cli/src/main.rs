//! Projector CLI
//!
//! Share a screen with everyone on the LAN through a browser.
//!
//! # Usage
//!
//! ```bash
//! # List available screens
//! projector list-sources
//!
//! # Run the server; open /project to start sharing
//! projector serve --port 8000
//!
//! # Write a config file to edit
//! projector config init
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Projector - LAN screen sharing over HLS
#[derive(Parser)]
#[command(name = "projector")]
#[command(version)]
#[command(about = "Share your screen with browsers on the local network", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control, viewer and stream server
    Serve(commands::ServeArgs),

    /// List available capture sources
    #[command(alias = "ls")]
    ListSources,

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The server reports its URLs through logging, so it starts at INFO
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["projector", "projector_core", "projector_cli"] {
        filter = filter.add_directive(format!("{}={}", target, level).parse()?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve(args) => commands::serve(args).await?,
        Commands::ListSources => commands::list_sources().await?,
        Commands::Config(args) => commands::config(args).await?,
    }

    Ok(())
}
