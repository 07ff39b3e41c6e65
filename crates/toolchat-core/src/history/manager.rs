//! Token-budget management
//!
//! Before a turn the history is measured; once it grows past
//! `max_history_tokens` it is replaced by a single model entry holding a
//! summary. Any failure along the way keeps the original history.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::logging::SharedLogger;
use crate::providers::{approximate_tokens, FinishReason, GenerateOptions, ModelBackend};
use crate::types::Content;

pub const DEFAULT_MAX_HISTORY_TOKENS: usize = 10_000;
pub const DEFAULT_TARGET_SUMMARY_TOKENS: usize = 2_000;
pub const DEFAULT_CACHE_DIR: &str = ".chat_history_cache";

const SUMMARY_TEMPERATURE: f32 = 0.5;
const SUMMARY_PREFIX: &str =
    "The conversation history up to this point has been summarized to save space. Key points:\n";

/// History limits and storage location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub max_history_tokens: usize,
    pub target_summary_tokens: usize,
    pub cache_dir: PathBuf,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_history_tokens: DEFAULT_MAX_HISTORY_TOKENS,
            target_summary_tokens: DEFAULT_TARGET_SUMMARY_TOKENS,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

/// Keeps a history under its token budget by summarizing it
pub struct HistoryManager {
    backend: Arc<dyn ModelBackend>,
    model: String,
    summarization_model: String,
    settings: HistorySettings,
    logger: SharedLogger,
}

impl HistoryManager {
    /// `model` is used for counting, `summarization_model` for the summary request
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        model: impl Into<String>,
        summarization_model: impl Into<String>,
        settings: HistorySettings,
        logger: SharedLogger,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            summarization_model: summarization_model.into(),
            settings,
            logger,
        }
    }

    pub fn settings(&self) -> &HistorySettings {
        &self.settings
    }

    /// Returns `(history, was_summarized, token_count)`
    pub async fn manage(&self, history: Vec<Content>) -> (Vec<Content>, bool, usize) {
        let tokens = self.count_tokens(&history).await;
        self.logger.debug(&format!(
            "[HistoryManager] History token count check: {}/{}",
            tokens, self.settings.max_history_tokens
        ));

        if tokens <= self.settings.max_history_tokens {
            return (history, false, tokens);
        }

        self.logger.info(&format!(
            "[HistoryManager] Token count ({}) exceeds limit ({}). Summarizing.",
            tokens, self.settings.max_history_tokens
        ));

        match self.summarize(&history).await {
            Some(summary) => {
                let summary_tokens = self.count_tokens(&summary).await;
                self.logger.info(&format!(
                    "[HistoryManager] History summarized: {} -> {} tokens (target ~{})",
                    tokens, summary_tokens, self.settings.target_summary_tokens
                ));
                (summary, true, summary_tokens)
            }
            None => {
                self.logger.warn(
                    "[HistoryManager] Summarization failed. Proceeding with original history.",
                );
                (history, false, tokens)
            }
        }
    }

    /// Backend count, falling back to the character estimate
    pub async fn count_tokens(&self, history: &[Content]) -> usize {
        if history.is_empty() {
            return 0;
        }
        match self.backend.count_tokens(history, &self.model).await {
            Ok(count) => count,
            Err(e) => {
                let estimate = approximate_tokens(history);
                self.logger.warn(&format!(
                    "[HistoryManager] Error counting tokens: {}. Using estimate {}",
                    e, estimate
                ));
                estimate
            }
        }
    }

    async fn summarize(&self, history: &[Content]) -> Option<Vec<Content>> {
        let transcript = history
            .iter()
            .filter_map(|entry| entry.text().map(|text| format!("{}: {}", entry.role, text)))
            .collect::<Vec<_>>()
            .join("\n---\n");

        if transcript.trim().is_empty() {
            self.logger
                .warn("[HistoryManager] History has no text to summarize");
            return None;
        }

        let prompt = format!(
            "Please summarize the following conversation history concisely. Focus on key topics, \
             entities, decisions, user requests, and outcomes. Aim for a summary around {} tokens \
             or less. Preserve important context needed to understand the conversation's \
             progression.\n\nConversation History:\n--- START HISTORY ---\n{}\n--- END HISTORY \
             ---\n\nConcise Summary:",
            self.settings.target_summary_tokens, transcript
        );

        let options = GenerateOptions::new(self.summarization_model.clone())
            .with_temperature(SUMMARY_TEMPERATURE);

        let response = match self
            .backend
            .generate(&[Content::user(prompt)], &[], &options)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.logger.error(&format!(
                    "[HistoryManager] Summarization request to {} failed: {}",
                    self.summarization_model, e
                ));
                return None;
            }
        };

        match response.text().map(|t| t.trim().to_string()) {
            Some(summary) if !summary.is_empty() => {
                Some(vec![Content::model_text(format!("{}{}", SUMMARY_PREFIX, summary))])
            }
            _ => {
                let blocked = response
                    .first_candidate()
                    .is_some_and(|c| c.finish_reason == FinishReason::Safety);
                self.logger.warn(&format!(
                    "[HistoryManager] Summarization returned no text{}. Feedback: {}",
                    if blocked { " (blocked by safety filter)" } else { "" },
                    response.prompt_feedback.as_deref().unwrap_or("N/A")
                ));
                None
            }
        }
    }
}

impl std::fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("backend", &self.backend.name())
            .field("summarization_model", &self.summarization_model)
            .field("settings", &self.settings)
            .finish()
    }
}
