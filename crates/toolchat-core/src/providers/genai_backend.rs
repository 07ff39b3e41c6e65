//! GenaiBackend - model backend using the genai crate
//!
//! Any model genai can route (Gemini, OpenAI, Anthropic, Ollama, ...) works;
//! the adapter is picked from the model name.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{ChatRequest, ChatStreamEvent};

use crate::logging::{preview, Logger};
use crate::types::{Content, FunctionCall, FunctionDeclaration};

use super::error::{BackendError, BackendResult};
use super::genai_adapter::{
    create_client, from_genai_tool_call, to_genai_messages, to_genai_options, to_genai_tools,
    to_model_entry,
};
use super::response::ModelResponse;
use super::traits::{GenerateOptions, ModelBackend};

const BACKEND_NAME: &str = "genai";

/// Model backend for every genai-supported API
pub struct GenaiBackend {
    /// Explicit key; `None` defers to genai's environment lookup
    api_key: Option<String>,
    logger: Arc<dyn Logger>,
}

impl GenaiBackend {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            api_key: None,
            logger,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl ModelBackend for GenaiBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn generate(
        &self,
        history: &[Content],
        declarations: &[FunctionDeclaration],
        options: &GenerateOptions,
    ) -> BackendResult<ModelResponse> {
        self.logger.info(&format!(
            "[GenaiBackend] generate: model={}, entries={}, tools={}",
            options.model,
            history.len(),
            declarations.len()
        ));

        let client = create_client(self.api_key.clone());

        let messages = to_genai_messages(
            history,
            options.system_instruction.as_deref(),
            self.logger.as_ref(),
        );
        let mut chat_req = ChatRequest::new(messages);
        if !declarations.is_empty() {
            chat_req = chat_req.with_tools(to_genai_tools(declarations));
        }

        let genai_options = to_genai_options(options);

        let chat_stream = client
            .exec_chat_stream(options.model.as_str(), chat_req, Some(&genai_options))
            .await
            .map_err(|e| BackendError::api_error(BACKEND_NAME, e.to_string()))?;

        let mut stream = Box::pin(chat_stream.stream);
        let mut text = String::new();
        let mut calls: Vec<FunctionCall> = Vec::new();

        while let Some(event) = stream.next().await {
            let event = event.map_err(|e| {
                self.logger.error(&format!("[GenaiBackend] Stream error: {}", e));
                BackendError::api_error(BACKEND_NAME, e.to_string())
            })?;

            match event {
                ChatStreamEvent::Chunk(chunk) => text.push_str(&chunk.content),
                ChatStreamEvent::End(end) => {
                    if let Some(tool_calls) = end.captured_tool_calls() {
                        calls.extend(tool_calls.iter().map(|tc| from_genai_tool_call(tc)));
                    }
                }
                _ => {}
            }
        }

        self.logger.debug(&format!(
            "[GenaiBackend] Response: {} chars, {} function calls: {}",
            text.chars().count(),
            calls.len(),
            preview(&text, 250)
        ));

        Ok(match to_model_entry(text, calls) {
            Some(entry) => ModelResponse::from_content(entry),
            None => ModelResponse::default(),
        })
    }
}
