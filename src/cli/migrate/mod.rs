//! Migrate command - applies or reverts the PostgreSQL schema

use clap::Args;
use tracing::info;

use crate::domain::DomainError;
use crate::infrastructure::storage::{connect, Migrator, PostgresConfig, PostgresMigrator};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Revert the most recently applied migration instead
    #[arg(long)]
    pub revert: bool,

    /// Database URL; overrides `storage.database_url`
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;

    let url = args
        .database_url
        .or(config.storage.database_url)
        .ok_or_else(|| DomainError::configuration("storage.database_url is required"))?;

    let pool = connect(&PostgresConfig::new(url)).await?;
    let migrator = PostgresMigrator::new(pool);

    if args.revert {
        migrator.revert().await?;
    } else {
        migrator.run().await?;
    }

    match migrator.version().await? {
        Some(version) => info!(version, "Schema is up to date"),
        None => info!("No migrations applied"),
    }

    Ok(())
}
