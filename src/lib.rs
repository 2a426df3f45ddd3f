//! Todo Relay
//!
//! Per-user task tracking behind a bearer-token gateway:
//! - Gateway that resolves bearer tokens through an identity provider
//! - Owner-scoped task storage (in-memory or PostgreSQL with row-level security)
//! - In-process GoTrue-compatible identity provider for local use
//! - Client-side session manager, gateway client and task view-model

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::{AppState, PublicConfig, TaskServiceTrait};
use config::{ProviderMode, StorageBackend};
use domain::DomainError;
use infrastructure::identity::{
    FixedCodeGenerator, HttpIdentityProvider, JwtConfig, JwtService, LocalIdentityProvider,
    LocalProviderConfig,
};
use infrastructure::storage::{connect, Migrator, PostgresConfig, PostgresMigrator};
use infrastructure::task::{InMemoryTaskRepository, PostgresTaskRepository, TaskService};
use tracing::{info, warn};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate()?;

    let task_service = create_task_service(config).await?;

    let public_config = PublicConfig {
        provider_url: config.public_provider_url(),
        provider_key: config.provider.key.clone(),
    };

    let state = match config.provider.mode {
        ProviderMode::Local => {
            info!("Using local identity provider");
            let provider = Arc::new(create_local_provider(config));
            AppState::new(task_service, provider.clone()).with_local_provider(provider)
        }
        ProviderMode::Remote => {
            let url = config
                .provider
                .url
                .as_deref()
                .ok_or_else(|| DomainError::configuration("provider.url is required"))?;
            info!(url = %url, "Using remote identity provider");
            let provider = HttpIdentityProvider::new(url, config.provider.key.clone())?;
            AppState::new(task_service, Arc::new(provider))
        }
    };

    Ok(state.with_public_config(public_config))
}

async fn create_task_service(config: &AppConfig) -> anyhow::Result<Arc<dyn TaskServiceTrait>> {
    info!("Storage backend: {:?}", config.storage.backend);

    match config.storage.backend {
        StorageBackend::Memory => {
            let repository = Arc::new(InMemoryTaskRepository::new());
            Ok(Arc::new(TaskService::new(repository)))
        }
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .ok_or_else(|| DomainError::configuration("storage.database_url is required"))?;

            info!("Connecting to PostgreSQL...");
            let pool = connect(
                &PostgresConfig::new(url).with_max_connections(config.storage.max_connections),
            )
            .await?;
            info!("PostgreSQL connection established");

            PostgresMigrator::new(pool.clone()).run().await?;

            let repository = Arc::new(PostgresTaskRepository::new(pool));
            Ok(Arc::new(TaskService::new(repository)))
        }
    }
}

/// Build the in-process provider from the `provider` and `auth` sections
pub fn create_local_provider(config: &AppConfig) -> LocalIdentityProvider {
    if config.auth.uses_default_secret() {
        warn!(
            "Using the built-in JWT secret. Tokens can be forged by anyone who knows it. \
            Set APP__AUTH__JWT_SECRET outside local development."
        );
    }

    let tokens = JwtService::new(JwtConfig::new(
        config.auth.jwt_secret.clone(),
        config.auth.jwt_expiration_hours,
    ));

    let provider = LocalIdentityProvider::new(
        tokens,
        LocalProviderConfig {
            require_email_verification: config.provider.require_email_verification,
            code_ttl: chrono::Duration::minutes(config.provider.code_ttl_minutes),
        },
    );

    match &config.provider.fixed_code {
        Some(code) => {
            warn!("Issuing a fixed verification code for every request");
            provider.with_code_generator(Arc::new(FixedCodeGenerator::new(code.clone())))
        }
        None => provider,
    }
}
