//! Configuration
//!
//! `AppConfig` is the whole configuration; providers load and store it:
//! - `MemoryConfigProvider`: In-memory for testing
//! - `FileConfigProvider`: YAML file-based (user/workspace level)

mod app;
mod file;
mod memory;
mod traits;

pub use app::{
    AppConfig, ConfigIssue, ModelSection, OrchestratorSection, Severity, API_KEY_ENV_VARS,
    DEFAULT_SYSTEM_INSTRUCTION, MODEL_ENV_VAR,
};
pub use file::{ConfigLevel, FileConfigProvider};
pub use memory::MemoryConfigProvider;
pub use traits::{ConfigError, ConfigProvider, ConfigResult};
