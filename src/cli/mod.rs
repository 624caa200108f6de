//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

/// Conversational intake core for municipal service reports and GBV support.
#[derive(Debug, Parser)]
#[command(name = "gugu", version, about)]
pub struct Cli {
    /// Emit machine-readable JSON where supported.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive chat loop against the router (demo transport).
    Chat(commands::chat::ChatArgs),
    /// Inspect or validate configuration.
    Config(commands::config::ConfigArgs),
}

/// Print a failed command's error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json: bool) {
    if json {
        eprintln!("{}", serde_json::json!({ "error": format!("{err:#}") }));
    } else {
        eprintln!("error: {err:#}");
    }
    std::process::exit(1);
}
