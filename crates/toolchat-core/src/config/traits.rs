//! Configuration provider trait

use async_trait::async_trait;

use super::app::AppConfig;

/// Configuration source abstraction
///
/// Implementations:
/// - `MemoryConfigProvider`: In-memory for testing
/// - `FileConfigProvider`: YAML (or JSON) file, user-level or explicit path
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Load the configuration; a missing source yields defaults
    async fn load(&self) -> ConfigResult<AppConfig>;

    /// Persist the configuration
    async fn save(&self, config: &AppConfig) -> ConfigResult<()>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
