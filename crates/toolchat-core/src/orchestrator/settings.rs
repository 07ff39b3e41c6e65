//! Orchestrator settings

use crate::providers::GenerateOptions;

pub const DEFAULT_MAX_FUNCTION_CALLS: usize = 25;
pub const DEFAULT_LOG_PREVIEW_LEN: usize = 250;
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Settings that stay fixed across turns
#[derive(Debug, Clone)]
pub struct TurnSettings {
    /// Tool iterations allowed before the turn is cut short
    pub max_function_calls: usize,
    pub log_preview_len: usize,
    pub generate: GenerateOptions,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            max_function_calls: DEFAULT_MAX_FUNCTION_CALLS,
            log_preview_len: DEFAULT_LOG_PREVIEW_LEN,
            generate: GenerateOptions::new(DEFAULT_MODEL).with_temperature(DEFAULT_TEMPERATURE),
        }
    }
}

impl TurnSettings {
    pub fn with_max_function_calls(mut self, max: usize) -> Self {
        self.max_function_calls = max;
        self
    }

    pub fn with_generate(mut self, options: GenerateOptions) -> Self {
        self.generate = options;
        self
    }
}
