//! `gugu config` subcommand: inspect and validate configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::infrastructure::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the merged effective configuration.
    Show,
    /// Load and validate configuration, reporting problems.
    Validate,
}

pub async fn execute(args: ConfigArgs, json: bool) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = ConfigLoader::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Validate => {
            ConfigLoader::load()?;
            if json {
                println!("{}", serde_json::json!({ "status": "ok" }));
            } else {
                println!("configuration OK");
            }
        }
    }
    Ok(())
}
