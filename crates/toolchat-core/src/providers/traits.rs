//! Model backend trait definition

use async_trait::async_trait;

use crate::types::{Content, FunctionDeclaration};

use super::error::BackendResult;
use super::response::ModelResponse;

/// Generation settings for a single request
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Model identifier as used by the backend's API
    pub model: String,
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// System instruction sent ahead of the history
    pub system_instruction: Option<String>,
}

impl GenerateOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
            system_instruction: None,
        }
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// A language model that supports function calling
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Backend name (e.g., "genai", "mock")
    fn name(&self) -> &str;

    /// Generate the next entry for `history`, offering `declarations` as callable functions
    async fn generate(
        &self,
        history: &[Content],
        declarations: &[FunctionDeclaration],
        options: &GenerateOptions,
    ) -> BackendResult<ModelResponse>;

    /// Count tokens for a history (approximate: ~4 characters per token)
    async fn count_tokens(&self, history: &[Content], _model: &str) -> BackendResult<usize> {
        Ok(approximate_tokens(history))
    }
}

/// Rough token estimate over every part of every entry
pub fn approximate_tokens(history: &[Content]) -> usize {
    let chars: usize = history
        .iter()
        .flat_map(|c| c.parts.iter())
        .map(|p| match serde_json::to_string(p) {
            Ok(s) => s.chars().count(),
            Err(_) => 0,
        })
        .sum();
    chars / 4
}
