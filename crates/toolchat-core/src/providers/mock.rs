//! Mock backend for testing
//!
//! Replays a scripted queue of responses without network access and records
//! every request it receives.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::error::{BackendError, BackendResult};
use super::response::{Candidate, FinishReason, ModelResponse};
use super::traits::{GenerateOptions, ModelBackend};
use crate::logging::Logger;
use crate::types::{Content, FunctionCall, FunctionDeclaration};

/// What to do once the script runs out
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Always request the same function call
    AlwaysCall(FunctionCall),
    /// Fail every request
    Error(String),
    /// Return a response with no candidates
    Empty,
}

/// A request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub history: Vec<Content>,
    pub tool_names: Vec<String>,
    pub model: String,
}

/// Scripted model backend
pub struct MockBackend {
    script: Mutex<VecDeque<BackendResult<ModelResponse>>>,
    mode: MockMode,
    requests: Mutex<Vec<RecordedRequest>>,
    logger: Arc<dyn Logger>,
}

impl MockBackend {
    /// Create a mock that echoes once its script is exhausted
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Echo, logger)
    }

    pub fn with_mode(mode: MockMode, logger: Arc<dyn Logger>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            mode,
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Create a fixed response backend
    pub fn fixed(response: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Fixed(response.into()), logger)
    }

    /// Queue a response
    pub fn then(self, response: ModelResponse) -> Self {
        self.script.lock().push_back(Ok(response));
        self
    }

    /// Queue a plain-text answer
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then(ModelResponse::from_content(Content::model_text(text)))
    }

    /// Queue a function call request
    pub fn then_call(self, name: &str, args: Value) -> Self {
        self.then(ModelResponse::from_content(Content::model_call(FunctionCall::new(
            name, args,
        ))))
    }

    /// Queue a failed request
    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .push_back(Err(BackendError::Other(message.into())));
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn last_user_text(history: &[Content]) -> String {
        history
            .iter()
            .rev()
            .filter(|c| c.role == crate::types::Role::User)
            .find_map(Content::text)
            .unwrap_or_else(|| "Hello from MockBackend!".to_string())
    }

    fn fallback(&self, history: &[Content]) -> BackendResult<ModelResponse> {
        match &self.mode {
            MockMode::Echo => Ok(ModelResponse::from_content(Content::model_text(format!(
                "Echo: {}",
                Self::last_user_text(history)
            )))),
            MockMode::Fixed(text) => Ok(ModelResponse::from_content(Content::model_text(
                text.clone(),
            ))),
            MockMode::AlwaysCall(call) => {
                Ok(ModelResponse::from_content(Content::model_call(call.clone())))
            }
            MockMode::Error(message) => Err(BackendError::Other(format!("Mock error: {}", message))),
            MockMode::Empty => Ok(ModelResponse::default()),
        }
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        history: &[Content],
        declarations: &[FunctionDeclaration],
        options: &GenerateOptions,
    ) -> BackendResult<ModelResponse> {
        self.requests.lock().push(RecordedRequest {
            history: history.to_vec(),
            tool_names: declarations.iter().map(|d| d.name.clone()).collect(),
            model: options.model.clone(),
        });

        let scripted = self.script.lock().pop_front();
        let result = match scripted {
            Some(result) => result,
            None => self.fallback(history),
        };

        self.logger.debug(&format!(
            "MockBackend: request #{} -> {}",
            self.request_count(),
            if result.is_ok() { "response" } else { "error" }
        ));
        result
    }
}

/// Response whose only candidate carries no content
pub fn withheld_response(reason: FinishReason) -> ModelResponse {
    ModelResponse {
        candidates: vec![Candidate {
            content: None,
            finish_reason: reason,
        }],
        ..Default::default()
    }
}
