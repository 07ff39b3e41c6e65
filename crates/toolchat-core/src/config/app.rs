//! Application configuration
//!
//! One `AppConfig` describes the model, the turn loop limits, history
//! management and the tool servers to launch. Stored as YAML:
//!
//! ```yaml
//! model:
//!   model: gemini-1.5-flash
//!   temperature: 0.5
//!   system_instruction_file: bot_config/system_instruction.md
//! orchestrator:
//!   max_function_calls: 25
//! filesystem_target_directories:
//!   - /home/me/notes
//! enable_memory_server: true
//! tool_servers:
//!   - id: search
//!     transport: http
//!     url: http://localhost:8811/mcp
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::history::HistorySettings;
use crate::logging::Logger;
use crate::orchestrator::{
    TurnSettings, DEFAULT_LOG_PREVIEW_LEN, DEFAULT_MAX_FUNCTION_CALLS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE,
};
use crate::providers::GenerateOptions;
use crate::servers::{ServerTimeouts, ToolServerConfig, ToolServerTransport};

use super::traits::{ConfigError, ConfigProvider, ConfigResult};

/// Environment variables consulted for the API key, in priority order
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "TOOLCHAT_API_KEY"];
pub const MODEL_ENV_VAR: &str = "TOOLCHAT_MODEL";

/// Used when `system_instruction_file` cannot be read and no inline text is set
pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant. Use the available tools when they help answer the user's request.";

const API_KEY_PLACEHOLDER: &str = "YOUR_";
const DEFAULT_MEMORY_FILE: &str = "memory.json";

/// Model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    /// Takes precedence over `system_instruction` when readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction_file: Option<PathBuf>,
    /// Model used to summarize long histories; defaults to `model`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarization_model: Option<String>,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            system_instruction: None,
            system_instruction_file: None,
            summarization_model: None,
        }
    }
}

/// Turn loop limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    pub max_function_calls: usize,
    pub tool_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
    pub log_preview_len: usize,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        let timeouts = ServerTimeouts::default();
        Self {
            max_function_calls: DEFAULT_MAX_FUNCTION_CALLS,
            tool_timeout_secs: timeouts.call.as_secs(),
            discovery_timeout_secs: timeouts.discovery.as_secs(),
            log_preview_len: DEFAULT_LOG_PREVIEW_LEN,
        }
    }
}

/// Severity of a configuration problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One problem found by `AppConfig::validate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub message: String,
}

impl ConfigIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub tool_servers: Vec<ToolServerConfig>,
    /// Shorthand for the filesystem server preset
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filesystem_target_directories: Vec<PathBuf>,
    /// Shorthand for the memory server preset
    #[serde(default)]
    pub enable_memory_server: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_file_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from `provider` and apply environment overrides
    pub async fn load_from(provider: &dyn ConfigProvider) -> ConfigResult<Self> {
        let mut config = provider.load().await?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_ENV_VARS.iter().find_map(|var| lookup(*var)) {
            self.model.api_key = Some(key);
        }
        if let Some(model) = lookup(MODEL_ENV_VAR) {
            self.model.model = model;
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.model.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn summarization_model(&self) -> &str {
        self.model
            .summarization_model
            .as_deref()
            .unwrap_or(&self.model.model)
    }

    /// Every configured server: presets from the shorthand fields first, then `tool_servers`
    pub fn tool_server_configs(&self) -> Vec<ToolServerConfig> {
        let mut configs = Vec::new();
        if !self.filesystem_target_directories.is_empty() {
            configs.push(ToolServerConfig::filesystem(&self.filesystem_target_directories));
        }
        if self.enable_memory_server {
            let path = self
                .memory_file_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEMORY_FILE));
            configs.push(ToolServerConfig::memory(path));
        }
        configs.extend(self.tool_servers.iter().cloned());
        configs
    }

    pub fn server_timeouts(&self) -> ServerTimeouts {
        ServerTimeouts {
            discovery: Duration::from_secs(self.orchestrator.discovery_timeout_secs),
            call: Duration::from_secs(self.orchestrator.tool_timeout_secs),
        }
    }

    /// Resolve the system instruction, reading `system_instruction_file` if set
    pub fn system_instruction(&self, logger: &dyn Logger) -> Option<String> {
        let inline = self
            .model
            .system_instruction
            .clone()
            .filter(|s| !s.trim().is_empty());

        let Some(path) = &self.model.system_instruction_file else {
            return inline;
        };

        match std::fs::read_to_string(path) {
            Ok(text) => {
                logger.info(&format!(
                    "[Config] Loaded system instruction from {}",
                    path.display()
                ));
                Some(text.trim().to_string())
            }
            Err(e) => {
                logger.warn(&format!(
                    "[Config] Could not read system instruction file {}: {}. Using fallback.",
                    path.display(),
                    e
                ));
                Some(inline.unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()))
            }
        }
    }

    pub fn generate_options(&self, logger: &dyn Logger) -> GenerateOptions {
        let mut options =
            GenerateOptions::new(self.model.model.clone()).with_temperature(self.model.temperature);
        if let Some(max_tokens) = self.model.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        if let Some(instruction) = self.system_instruction(logger) {
            options = options.with_system_instruction(instruction);
        }
        options
    }

    pub fn turn_settings(&self, logger: &dyn Logger) -> TurnSettings {
        TurnSettings {
            max_function_calls: self.orchestrator.max_function_calls,
            log_preview_len: self.orchestrator.log_preview_len,
            generate: self.generate_options(logger),
        }
    }

    /// Check the configuration; returns every problem found
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        match self.api_key() {
            None => issues.push(ConfigIssue::error(format!(
                "Model API key is missing. Set {} or model.api_key.",
                API_KEY_ENV_VARS[0]
            ))),
            Some(key) if key.contains(API_KEY_PLACEHOLDER) => issues.push(ConfigIssue::error(
                "Model API key is using a placeholder value. Please replace it.",
            )),
            Some(_) => {}
        }

        if self.orchestrator.max_function_calls == 0 {
            issues.push(ConfigIssue::error(
                "orchestrator.max_function_calls must be at least 1.",
            ));
        }
        if self.orchestrator.tool_timeout_secs == 0 || self.orchestrator.discovery_timeout_secs == 0 {
            issues.push(ConfigIssue::error("Tool server timeouts must be at least 1 second."));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            issues.push(ConfigIssue::warning(format!(
                "Temperature {} is outside the usual 0.0-2.0 range.",
                self.model.temperature
            )));
        }

        for dir in &self.filesystem_target_directories {
            if !dir.is_dir() {
                issues.push(ConfigIssue::error(format!(
                    "Directory '{}' not found or is not a directory.",
                    dir.display()
                )));
            }
        }

        let servers = self.tool_server_configs();
        let mut seen = HashSet::new();
        for server in &servers {
            if !seen.insert(server.id.as_str()) {
                issues.push(ConfigIssue::error(format!(
                    "Duplicate tool server id '{}'.",
                    server.id
                )));
            }
            let empty = match &server.transport {
                ToolServerTransport::Stdio { command, .. } => command.trim().is_empty(),
                ToolServerTransport::Http { url } => url.trim().is_empty(),
            };
            if empty {
                issues.push(ConfigIssue::error(format!(
                    "Tool server '{}' has no command or url.",
                    server.id
                )));
            }
        }

        if !servers.iter().any(|s| s.enabled) {
            issues.push(ConfigIssue::error("No tool servers are configured or enabled."));
        }

        issues
    }

    /// `validate`, failing if any issue is an error
    pub fn ensure_valid(&self) -> ConfigResult<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(ConfigIssue::is_error)
            .map(|i| i.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
