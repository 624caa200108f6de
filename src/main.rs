//! Gugu CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gugu::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chat(args) => gugu::cli::commands::chat::execute(args, cli.json).await,
        Commands::Config(args) => gugu::cli::commands::config::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        gugu::cli::handle_error(err, cli.json);
    }
}
