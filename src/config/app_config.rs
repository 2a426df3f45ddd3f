use serde::Deserialize;

use crate::domain::DomainError;

const DEFAULT_JWT_SECRET: &str = "local-development-secret-change-me";

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// In-process provider with `/auth/v1` routes mounted on this server
    #[default]
    Local,
    /// Hosted provider reached over HTTP
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub mode: ProviderMode,
    /// Base URL handed to clients; derived from the server address in local mode when unset
    pub url: Option<String>,
    /// Public (anon) key sent as the `apikey` header
    pub key: String,
    pub require_email_verification: bool,
    pub code_ttl_minutes: i64,
    /// Issue this code instead of a random one (local mode only)
    pub fixed_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            max_connections: 10,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::default(),
            url: None,
            key: "local-anon-key".to_string(),
            require_email_verification: true,
            code_ttl_minutes: 15,
            fixed_code: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiration_hours: 1,
        }
    }
}

impl AuthConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject combinations the server cannot start with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.storage.backend == StorageBackend::Postgres
            && self.storage.database_url.as_deref().is_none_or(str::is_empty)
        {
            return Err(DomainError::configuration(
                "storage.database_url is required for the postgres backend",
            ));
        }

        if self.provider.mode == ProviderMode::Remote
            && self.provider.url.as_deref().is_none_or(str::is_empty)
        {
            return Err(DomainError::configuration(
                "provider.url is required for the remote provider",
            ));
        }

        if self.provider.code_ttl_minutes <= 0 {
            return Err(DomainError::configuration(
                "provider.code_ttl_minutes must be positive",
            ));
        }

        Ok(())
    }

    /// Provider base URL as clients should see it
    pub fn public_provider_url(&self) -> String {
        match &self.provider.url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => {
                let host = match self.server.host.as_str() {
                    "0.0.0.0" | "::" => "localhost",
                    host => host,
                };
                format!("http://{}:{}", host, self.server.port)
            }
        }
    }
}
