//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/toolchat/config.yaml) and workspace-level
//! (.config/toolchat/config.yaml) config. A `.json` path is read and written as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::app::AppConfig;
use super::traits::{ConfigError, ConfigProvider, ConfigResult};

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/toolchat/config.yaml)
    User,
    /// Workspace-level config (.config/toolchat/config.yaml in workspace root)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// File-based configuration provider
///
/// A missing file loads as `AppConfig::default()`.
///
/// # Example
///
/// ```no_run
/// use toolchat_core::config::FileConfigProvider;
///
/// let user_config = FileConfigProvider::user();
/// let workspace_config = FileConfigProvider::workspace("/path/to/workspace");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<AppConfig>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// User-level config provider (~/.config/toolchat/config.yaml)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        Self::new(config_dir.join("toolchat").join("config.yaml"), ConfigLevel::User)
    }

    /// Workspace-level config provider (.config/toolchat/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root
            .as_ref()
            .join(".config")
            .join("toolchat")
            .join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }

    fn read(&self) -> ConfigResult<AppConfig> {
        if !self.path.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        if self.is_json() {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }

    fn write(&self, config: &AppConfig) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = if self.is_json() {
            serde_json::to_string_pretty(config)?
        } else {
            serde_yaml::to_string(config)?
        };
        fs::write(&self.path, content)?;

        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    fn cached_or_read(&self) -> ConfigResult<AppConfig> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<AppConfig> {
        let config = self.read()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Copy the current file next to itself with a `.backup` suffix
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| ConfigError::Other("config path has no file name".into()))?;
        name.push(".backup");
        let backup_path = self.path.with_file_name(name);
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }

    pub fn export_json(&self) -> ConfigResult<String> {
        let config = self.cached_or_read()?;
        Ok(serde_json::to_string_pretty(&config)?)
    }

    pub fn import_json(&self, json: &str) -> ConfigResult<()> {
        let config: AppConfig = serde_json::from_str(json)?;
        self.write(&config)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load(&self) -> ConfigResult<AppConfig> {
        self.cached_or_read()
    }

    async fn save(&self, config: &AppConfig) -> ConfigResult<()> {
        self.write(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servers::{ToolServerConfig, ToolServerTransport};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let provider = FileConfigProvider::new(dir.path().join("config.yaml"), ConfigLevel::User);

        assert!(!provider.exists());
        let config = provider.load().await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let provider = FileConfigProvider::new(&path, ConfigLevel::Workspace);

        let mut config = AppConfig::default();
        config.orchestrator.max_function_calls = 9;
        config.tool_servers.push(ToolServerConfig::new(
            "search",
            ToolServerTransport::http("http://localhost:8811/mcp"),
        ));
        provider.save(&config).await.unwrap();

        assert!(provider.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("max_function_calls: 9"));
        assert!(content.contains("http://localhost:8811/mcp"));

        let fresh = FileConfigProvider::new(&path, ConfigLevel::Workspace);
        assert_eq!(fresh.load().await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_edits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let provider = FileConfigProvider::new(&path, ConfigLevel::User);

        assert_eq!(provider.load().await.unwrap().orchestrator.max_function_calls, 25);

        fs::write(&path, "orchestrator:\n  max_function_calls: 3\n").unwrap();
        // Cached until reloaded
        assert_eq!(provider.load().await.unwrap().orchestrator.max_function_calls, 25);
        assert_eq!(provider.reload().unwrap().orchestrator.max_function_calls, 3);
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "orchestrator: [not, a, map").unwrap();

        let provider = FileConfigProvider::new(&path, ConfigLevel::User);
        assert!(matches!(provider.load().await, Err(ConfigError::Yaml(_))));
    }

    #[tokio::test]
    async fn test_json_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"model": {"model": "gemini-2.0-flash"}}"#).unwrap();

        let provider = FileConfigProvider::new(&path, ConfigLevel::User);
        let config = provider.load().await.unwrap();
        assert_eq!(config.model.model, "gemini-2.0-flash");
        assert_eq!(config.model.temperature, 0.5);
    }

    #[test]
    fn test_export_import_json() {
        let dir = tempdir().unwrap();
        let source = FileConfigProvider::new(dir.path().join("a.yaml"), ConfigLevel::User);
        let target = FileConfigProvider::new(dir.path().join("b.yaml"), ConfigLevel::User);

        let json = source.export_json().unwrap();
        target.import_json(&json).unwrap();

        assert!(target.exists());
        assert_eq!(target.reload().unwrap(), AppConfig::default());
        assert!(target.import_json("{ nope").is_err());
    }

    #[test]
    fn test_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let provider = FileConfigProvider::new(&path, ConfigLevel::User);

        assert!(provider.backup().unwrap().is_none());

        fs::write(&path, "tool_servers: []").unwrap();
        let backup_path = provider.backup().unwrap().unwrap();
        assert!(backup_path.exists());
        assert!(backup_path.to_string_lossy().ends_with("config.yaml.backup"));
    }

    #[test]
    fn test_locations() {
        let workspace = FileConfigProvider::workspace("/work");
        assert_eq!(workspace.path(), Path::new("/work/.config/toolchat/config.yaml"));
        assert_eq!(workspace.level().as_str(), "workspace");
        assert!(FileConfigProvider::user().path().ends_with("toolchat/config.yaml"));
    }
}
