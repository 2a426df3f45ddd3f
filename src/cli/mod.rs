//! CLI module for Todo Relay
//!
//! Provides subcommands:
//! - `serve`: run the gateway (and the local auth routes in local mode)
//! - `migrate`: apply or revert the PostgreSQL schema

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Todo Relay - per-user task tracking behind a bearer-token gateway
#[derive(Parser)]
#[command(name = "todo-relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway server
    Serve,

    /// Apply pending schema migrations
    Migrate(migrate::MigrateArgs),
}

/// Load `.env`, the layered configuration and the log subscriber
fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);
    config.validate()?;

    Ok(config)
}
