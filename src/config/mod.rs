mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, LogFormat, LoggingConfig, ProviderConfig, ProviderMode, ServerConfig,
    StorageBackend, StorageConfig,
};
