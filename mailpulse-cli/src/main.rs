//! mailpulse CLI tool

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{AlertCommand, CheckConfigCommand, SendCommand, ServeCommand, TrackCommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mailpulse")]
#[command(version)]
#[command(about = "Transactional email delivery with open tracking", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./mailpulse.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (send endpoint and tracking pixel)
    Serve(ServeCommand),
    /// Send an email
    Send(SendCommand),
    /// Send a system alert to the configured alert recipients
    Alert(AlertCommand),
    /// Check the configuration and report every problem
    CheckConfig,
    /// Manage open tracking records
    Track {
        #[command(subcommand)]
        command: TrackCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mailpulse::observability::init()?;

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(cmd) => cmd.execute(config).await?,
        Commands::Send(cmd) => cmd.execute(&config).await?,
        Commands::Alert(cmd) => cmd.execute(&config).await?,
        Commands::CheckConfig => CheckConfigCommand::execute(&config)?,
        Commands::Track { command } => command.execute(&config).await?,
    }

    Ok(())
}
