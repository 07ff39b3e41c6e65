//! Model backend response types

use serde::{Deserialize, Serialize};

use crate::types::Content;

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    #[default]
    Unspecified,
    /// Backend-specific reason not covered above
    Other(String),
}

impl FinishReason {
    /// Map a backend's reason string (`"stop"`, `"length"`, `"MAX_TOKENS"`, ...)
    pub fn from_backend(reason: &str) -> Self {
        match reason.to_ascii_lowercase().as_str() {
            "stop" | "end_turn" | "tool_calls" | "tool_use" => FinishReason::Stop,
            "length" | "max_tokens" => FinishReason::MaxTokens,
            "safety" | "content_filter" => FinishReason::Safety,
            "recitation" => FinishReason::Recitation,
            "" | "unspecified" | "finish_reason_unspecified" => FinishReason::Unspecified,
            _ => FinishReason::Other(reason.to_string()),
        }
    }
}

impl From<String> for FinishReason {
    fn from(reason: String) -> Self {
        FinishReason::from_backend(&reason)
    }
}

impl From<FinishReason> for String {
    fn from(reason: FinishReason) -> Self {
        reason.to_string()
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "STOP"),
            FinishReason::MaxTokens => write!(f, "MAX_TOKENS"),
            FinishReason::Safety => write!(f, "SAFETY"),
            FinishReason::Recitation => write!(f, "RECITATION"),
            FinishReason::Unspecified => write!(f, "UNSPECIFIED"),
            FinishReason::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// One generated alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Generated entry; absent when the backend withheld the output
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: FinishReason,
}

impl Candidate {
    pub fn new(content: Content) -> Self {
        Self {
            content: Some(content),
            finish_reason: FinishReason::Stop,
        }
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = reason;
        self
    }
}

/// Result of one `generate` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelResponse {
    pub candidates: Vec<Candidate>,
    /// Plain-text answer reported outside any candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Reason the prompt itself was blocked, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<String>,
}

impl ModelResponse {
    /// Response with a single candidate
    pub fn from_content(content: Content) -> Self {
        Self {
            candidates: vec![Candidate::new(content)],
            ..Default::default()
        }
    }

    /// Response with no candidates and only top-level text
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Text of the first candidate, falling back to the top-level text
    pub fn text(&self) -> Option<String> {
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .and_then(Content::text)
            .or_else(|| self.text.clone().filter(|t| !t.is_empty()))
    }
}
