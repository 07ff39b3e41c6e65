//! TurnOrchestrator - the bounded function-calling loop

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::logging::{preview, SharedLogger};
use crate::providers::{BackendError, BackendResult, ModelBackend, ModelResponse};
use crate::tools::{ToolCatalog, ToolRegistry};
use crate::types::{CancellationToken, Content, FunctionCall, FunctionResponse, Progress, ToolOutput};
use crate::{log_debug, log_info, log_warn};

use super::settings::TurnSettings;
use super::state::{TurnOptions, TurnResult, TurnState, TurnStatus};

const CANCELLED_TEXT: &str = "Turn cancelled.";

/// Working state of one turn; dropped when the turn ends
struct Turn {
    history: Vec<Content>,
    catalog: ToolCatalog,
    iterations: usize,
    last_text: Option<String>,
    progress: Progress,
    cancel: Option<CancellationToken>,
}

impl Turn {
    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, CancellationToken::is_cancelled)
    }

    fn step(&self, message: &str) {
        self.progress.step(message);
    }
}

/// Runs user turns against a model backend and a set of tool servers
///
/// Both dependencies are injected once; until both are present every turn
/// returns `TurnStatus::NotReady` with the history untouched.
pub struct TurnOrchestrator {
    backend: Option<Arc<dyn ModelBackend>>,
    registry: Option<Arc<ToolRegistry>>,
    settings: TurnSettings,
    logger: SharedLogger,
}

impl TurnOrchestrator {
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            backend: None,
            registry: None,
            settings: TurnSettings::default(),
            logger,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_settings(mut self, settings: TurnSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_some() && self.registry.is_some()
    }

    /// Run one turn.
    ///
    /// `history` is never modified; the returned history is `history` plus
    /// every entry produced during the turn.
    pub async fn run_turn(&self, prompt: &str, history: &[Content], options: &TurnOptions) -> TurnResult {
        let steps = Arc::new(Mutex::new(Vec::<String>::new()));
        let progress = {
            let steps = Arc::clone(&steps);
            let outer = options.progress.clone();
            Progress::new(Arc::new(move |message: &str| {
                steps.lock().push(message.to_string());
                outer.step(message);
            }))
        };
        let finish = |text: String, history: Vec<Content>, status: TurnStatus, tool_calls: usize| TurnResult {
            final_text: text,
            history,
            status,
            tool_calls,
            steps: std::mem::take(&mut *steps.lock()),
        };

        let (backend, registry) = match (&self.backend, &self.registry) {
            (Some(backend), Some(registry)) => (Arc::clone(backend), Arc::clone(registry)),
            (None, _) => {
                self.logger.error("[Orchestrator] run_turn called before the model backend was set");
                progress.step("Initialization error.");
                return finish("Error: Chat processor not ready.".into(), history.to_vec(), TurnStatus::NotReady, 0);
            }
            (_, None) => {
                self.logger.error("[Orchestrator] run_turn called before tool servers were set");
                progress.step("Initialization error.");
                return finish("Error: Tool servers not ready.".into(), history.to_vec(), TurnStatus::NotReady, 0);
            }
        };

        if prompt.trim().is_empty() {
            self.logger.warn("[Orchestrator] Rejecting empty prompt");
            progress.step("Input processing error.");
            return finish(
                "Error processing user input: the prompt is empty.".into(),
                history.to_vec(),
                TurnStatus::Failed,
                0,
            );
        }

        if registry.is_empty() {
            progress.step("Warning: Tool servers may not be available.");
        }

        let mut working = history.to_vec();
        working.push(Content::user(prompt));
        progress.step(&format!(
            "Processing prompt: '{}'",
            preview(prompt, self.settings.log_preview_len)
        ));

        let catalog = registry.discover(&progress).await;
        log_info!(
            self.logger,
            "[Orchestrator] Discovered {} tools for this turn",
            catalog.len()
        );

        let mut turn = Turn {
            history: working,
            catalog,
            iterations: 0,
            last_text: None,
            progress,
            cancel: options.cancel.clone(),
        };

        let (status, text) = self.drive(backend.as_ref(), &mut turn).await;
        let iterations = turn.iterations;
        finish(text, turn.history, status, iterations)
    }

    /// Step the state machine until it reaches `Done`
    async fn drive(&self, backend: &dyn ModelBackend, turn: &mut Turn) -> (TurnStatus, String) {
        let mut state = TurnState::AwaitingModel;
        loop {
            state = match state {
                TurnState::AwaitingModel => self.await_model(backend, turn).await,
                TurnState::FunctionCallRequested(call) => {
                    self.execute_call(turn, call).await;
                    TurnState::ToolExecuted
                }
                TurnState::ToolExecuted => {
                    turn.iterations += 1;
                    TurnState::AwaitingModel
                }
                TurnState::TextProduced(text) => {
                    log_debug!(
                        self.logger,
                        "[Orchestrator] Final text: {}",
                        preview(&text, self.settings.log_preview_len)
                    );
                    TurnState::Done {
                        status: TurnStatus::Answered,
                        text,
                    }
                }
                TurnState::Error { status, message } => {
                    log_warn!(self.logger, "[Orchestrator] Turn ended: {}", message);
                    TurnState::Done { status, text: message }
                }
                TurnState::Done { status, text } => return (status, text),
            };
        }
    }

    async fn await_model(&self, backend: &dyn ModelBackend, turn: &mut Turn) -> TurnState {
        if turn.is_cancelled() {
            return self.cancelled(turn);
        }

        let max = self.settings.max_function_calls;
        if turn.iterations >= max {
            return self.limit_reached(turn);
        }

        turn.step(&format!(
            "Sending request to model (iteration {})...",
            turn.iterations + 1
        ));

        match backend.count_tokens(&turn.history, &self.settings.generate.model).await {
            Ok(tokens) => log_debug!(self.logger, "[Orchestrator] Total tokens for next request: {}", tokens),
            Err(e) => log_warn!(self.logger, "[Orchestrator] Failed to count tokens: {}", e),
        }

        let response = match self.generate(backend, turn).await {
            Ok(response) => response,
            Err(BackendError::Cancelled) => return self.cancelled(turn),
            Err(e) => {
                turn.step(&format!("Unexpected error during model call: {}", e));
                return TurnState::Error {
                    status: TurnStatus::Failed,
                    message: format!("An unexpected server error occurred: {}", e),
                };
            }
        };

        self.interpret(turn, response)
    }

    /// Call the backend, abandoning the request if the turn is cancelled meanwhile
    async fn generate(&self, backend: &dyn ModelBackend, turn: &Turn) -> BackendResult<ModelResponse> {
        let request = backend.generate(
            &turn.history,
            turn.catalog.declarations(),
            &self.settings.generate,
        );
        match &turn.cancel {
            Some(token) => {
                tokio::select! {
                    response = request => response,
                    _ = token.cancelled() => Err(BackendError::Cancelled),
                }
            }
            None => request.await,
        }
    }

    /// Decide the next state from a model response
    fn interpret(&self, turn: &mut Turn, response: ModelResponse) -> TurnState {
        let Some(candidate) = response.first_candidate() else {
            let feedback = response.prompt_feedback.as_deref().unwrap_or("N/A");
            turn.step(&format!(
                "Warning: Model response had no candidates. Feedback: {}",
                feedback
            ));
            return match response.text() {
                Some(text) => {
                    turn.history.push(Content::model_text(text.clone()));
                    TurnState::TextProduced(text)
                }
                None => TurnState::Error {
                    status: TurnStatus::Failed,
                    message: "Error: Model returned no candidates and no text.".into(),
                },
            };
        };

        let Some(content) = candidate.content.clone() else {
            turn.step("Warning: Model candidate had no content.");
            return TurnState::Error {
                status: TurnStatus::Failed,
                message: format!(
                    "Error: Model response lacked content (finish reason: {}).",
                    candidate.finish_reason
                ),
            };
        };

        turn.history.push(content);
        let content = &turn.history[turn.history.len() - 1];

        let text = content.text();
        if text.is_some() {
            turn.last_text = text.clone();
        }

        if let Some(call) = content.first_function_call() {
            let ignored = content.function_calls().count() - 1;
            if ignored > 0 {
                log_debug!(
                    self.logger,
                    "[Orchestrator] Ignoring {} additional function calls after '{}'",
                    ignored,
                    call.name
                );
            }
            let call = call.clone();
            turn.step(&format!(
                "Model wants to use tool: {} (call {}/{})",
                call.name,
                turn.iterations + 1,
                self.settings.max_function_calls
            ));
            return TurnState::FunctionCallRequested(call);
        }

        turn.step("Model provided final response.");
        match text.or_else(|| response.text()) {
            Some(text) => TurnState::TextProduced(text),
            None => {
                turn.step("Warning: Model finished but provided no text.");
                TurnState::Error {
                    status: TurnStatus::NoActionableResponse,
                    message: format!(
                        "Warning: Model finished (reason: {}) but did not provide a textual response.",
                        candidate.finish_reason
                    ),
                }
            }
        }
    }

    /// Dispatch one function call and append its response to the history
    async fn execute_call(&self, turn: &mut Turn, call: FunctionCall) {
        let name = call.name.clone();

        let response = match turn.catalog.dispatch(&name) {
            None => {
                turn.step(&format!("Error: Model requested unknown tool '{}'.", name));
                log_warn!(self.logger, "[Orchestrator] Tool '{}' not found in any server's catalog", name);
                FunctionResponse::error(&call, format!("Tool '{}' is not available or configured.", name))
            }
            Some(server) => {
                turn.step(&format!("Executing tool '{}' via server '{}'...", name, server.id()));
                log_debug!(
                    self.logger,
                    "[Orchestrator] Calling '{}' on '{}' with args: {}",
                    name,
                    server.id(),
                    call.args
                );

                match server.call_tool(&name, arguments_of(&call)).await {
                    Ok(output) => {
                        turn.step(&match &output {
                            ToolOutput::Text(_) => format!("Tool '{}' executed successfully.", name),
                            ToolOutput::Structured(_) => format!(
                                "Warning: Tool '{}' result part lacks 'text'. Using raw part representation.",
                                name
                            ),
                            ToolOutput::Raw(_) => format!(
                                "Warning: Tool '{}' result has unexpected structure or no content. Using raw result.",
                                name
                            ),
                        });
                        let text = output.into_text();
                        log_debug!(
                            self.logger,
                            "[Orchestrator] Tool '{}' output preview: {}",
                            name,
                            preview(&text, self.settings.log_preview_len)
                        );
                        FunctionResponse::success(&call, text)
                    }
                    Err(e) => {
                        turn.step(&format!(
                            "Error executing tool '{}' on server '{}'.",
                            name,
                            server.id()
                        ));
                        log_warn!(self.logger, "[Orchestrator] {}", e);
                        FunctionResponse::error(
                            &call,
                            format!(
                                "Failed to execute tool '{}'. Server connection or execution failed.",
                                name
                            ),
                        )
                    }
                }
            }
        };

        turn.history.push(Content::tool_response(response));
        turn.step("Sending tool result back to model...");
    }

    fn limit_reached(&self, turn: &Turn) -> TurnState {
        let max = self.settings.max_function_calls;
        log_warn!(self.logger, "[Orchestrator] Reached maximum function call limit ({})", max);
        turn.step(&format!(
            "Warning: Reached maximum tool call limit ({}). The response might be incomplete.",
            max
        ));

        let warning = format!("(Warning: Reached maximum tool call limit of {})", max);
        let text = match &turn.last_text {
            Some(text) => format!("{}\n\n{}", text, warning),
            None => warning,
        };
        TurnState::Done {
            status: TurnStatus::LimitReached,
            text,
        }
    }

    fn cancelled(&self, turn: &Turn) -> TurnState {
        self.logger.info("[Orchestrator] Turn cancelled");
        turn.step(CANCELLED_TEXT);
        let text = match &turn.last_text {
            Some(text) => format!("{}\n\n{}", text, CANCELLED_TEXT),
            None => CANCELLED_TEXT.to_string(),
        };
        TurnState::Done {
            status: TurnStatus::Cancelled,
            text,
        }
    }
}

/// Arguments as sent to a tool server; a call without arguments gets `{}`
fn arguments_of(call: &FunctionCall) -> Value {
    match &call.args {
        Value::Null => json!({}),
        args => args.clone(),
    }
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{MemoryLogger, NoOpLogger};
    use crate::providers::{withheld_response, FinishReason, MockBackend, MockMode};
    use crate::servers::{LocalToolServer, ToolServer};
    use crate::types::{tool_results_are_paired, Part, Role, ToolDescriptor};

    fn fs_server() -> LocalToolServer {
        LocalToolServer::new("filesystem").with_tool(
            ToolDescriptor::new("list_dir", "List a directory").with_schema(json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            })),
            |args| match args.get("path").and_then(Value::as_str) {
                Some("/tmp") => Ok(ToolOutput::Text("a.txt\nb.txt".into())),
                _ => Err("no such directory".into()),
            },
        )
    }

    fn orchestrator(backend: Arc<MockBackend>, servers: Vec<Arc<dyn ToolServer>>) -> TurnOrchestrator {
        let logger = NoOpLogger::shared();
        TurnOrchestrator::new(logger.clone())
            .with_backend(backend)
            .with_registry(Arc::new(ToolRegistry::new(servers, logger)))
    }

    fn roles(history: &[Content]) -> Vec<Role> {
        history.iter().map(|c| c.role).collect()
    }

    #[tokio::test]
    async fn test_list_dir_round_trip() {
        let backend = Arc::new(
            MockBackend::new(NoOpLogger::shared())
                .then_call("list_dir", json!({"path": "/tmp"}))
                .then_text("/tmp contains a.txt and b.txt."),
        );
        let server = Arc::new(fs_server());
        let orch = orchestrator(backend.clone(), vec![server.clone()]);

        let result = orch.run_turn("list files in /tmp", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::Answered);
        assert_eq!(result.final_text, "/tmp contains a.txt and b.txt.");
        assert_eq!(result.tool_calls, 1);
        assert_eq!(roles(&result.history), vec![Role::User, Role::Model, Role::Tool, Role::Model]);

        let response = result.history[2].parts[0].as_function_response().unwrap();
        assert_eq!(response.name, "list_dir");
        assert_eq!(response.content(), Some("a.txt\nb.txt"));
        assert!(tool_results_are_paired(&result.history));

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tool_names, vec!["list_dir"]);
        assert_eq!(requests[1].history.len(), 3);
        assert_eq!(server.calls(), vec![("list_dir".to_string(), json!({"path": "/tmp"}))]);
    }

    #[tokio::test]
    async fn test_unknown_tool_continues_turn() {
        let backend = Arc::new(
            MockBackend::new(NoOpLogger::shared())
                .then_call("unknown_tool", json!({}))
                .then_text("Sorry, I cannot do that."),
        );
        let orch = orchestrator(backend.clone(), vec![Arc::new(fs_server())]);

        let result = orch.run_turn("do something", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::Answered);
        assert_eq!(backend.request_count(), 2);

        let response = result.history[2].parts[0].as_function_response().unwrap();
        assert!(response.is_error());
        assert_eq!(response.name, "unknown_tool");
        assert!(response.error_message().unwrap().contains("unknown_tool"));

        // The second request already carries the error
        assert_eq!(backend.requests()[1].history.last(), result.history.get(2));
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_to_model() {
        let backend = Arc::new(
            MockBackend::new(NoOpLogger::shared())
                .then_call("list_dir", json!({"path": "/missing"}))
                .then_text("That directory does not exist."),
        );
        let orch = orchestrator(backend, vec![Arc::new(fs_server())]);

        let result = orch.run_turn("list /missing", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::Answered);
        let response = result.history[2].parts[0].as_function_response().unwrap();
        assert_eq!(
            response.error_message(),
            Some("Failed to execute tool 'list_dir'. Server connection or execution failed.")
        );
        assert!(result
            .steps
            .contains(&"Error executing tool 'list_dir' on server 'filesystem'.".to_string()));
    }

    #[tokio::test]
    async fn test_iteration_ceiling() {
        let call = FunctionCall::new("ping", json!({}));
        let backend = Arc::new(
            MockBackend::with_mode(MockMode::AlwaysCall(call.clone()), NoOpLogger::shared()).then(
                ModelResponse::from_content(Content::new(
                    Role::Model,
                    vec![Part::text("Still working"), Part::FunctionCall(call)],
                )),
            ),
        );
        let server = Arc::new(LocalToolServer::new("net").with_text_tool("ping", "pong"));
        let orch = orchestrator(backend.clone(), vec![server.clone()])
            .with_settings(TurnSettings::default().with_max_function_calls(3));

        let result = orch.run_turn("ping forever", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::LimitReached);
        assert_eq!(result.tool_calls, 3);
        assert_eq!(backend.request_count(), 3);
        assert_eq!(server.calls().len(), 3);
        assert_eq!(result.history.len(), 1 + 3 * 2);
        assert_eq!(
            result.final_text,
            "Still working\n\n(Warning: Reached maximum tool call limit of 3)"
        );
        assert!(tool_results_are_paired(&result.history));
    }

    #[tokio::test]
    async fn test_ceiling_without_text() {
        let backend = Arc::new(MockBackend::with_mode(
            MockMode::AlwaysCall(FunctionCall::new("ping", json!({}))),
            NoOpLogger::shared(),
        ));
        let orch = orchestrator(
            backend,
            vec![Arc::new(LocalToolServer::new("net").with_text_tool("ping", "pong"))],
        )
        .with_settings(TurnSettings::default().with_max_function_calls(2));

        let result = orch.run_turn("ping", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::LimitReached);
        assert_eq!(result.final_text, "(Warning: Reached maximum tool call limit of 2)");
    }

    #[tokio::test]
    async fn test_no_candidates_no_text() {
        let backend = Arc::new(MockBackend::with_mode(MockMode::Empty, NoOpLogger::shared()));
        let orch = orchestrator(backend, vec![Arc::new(fs_server())]);
        let prior = vec![Content::user("hi"), Content::model_text("hello")];

        let result = orch.run_turn("again", &prior, &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::Failed);
        assert!(result.final_text.contains("no candidates"));
        assert_eq!(result.history.len(), 3);
        assert_eq!(&result.history[..2], &prior[..]);
    }

    #[tokio::test]
    async fn test_no_candidates_with_text() {
        let backend = Arc::new(
            MockBackend::new(NoOpLogger::shared()).then(ModelResponse::text_only("plain answer")),
        );
        let orch = orchestrator(backend, vec![Arc::new(fs_server())]);

        let result = orch.run_turn("hi", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::Answered);
        assert_eq!(result.final_text, "plain answer");
        assert_eq!(result.history.last(), Some(&Content::model_text("plain answer")));
    }

    #[tokio::test]
    async fn test_withheld_candidate() {
        let backend = Arc::new(
            MockBackend::new(NoOpLogger::shared()).then(withheld_response(FinishReason::Safety)),
        );
        let orch = orchestrator(backend, vec![Arc::new(fs_server())]);

        let result = orch.run_turn("hi", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::Failed);
        assert!(result.final_text.contains("SAFETY"));
        assert_eq!(result.history.len(), 1);
    }

    #[tokio::test]
    async fn test_no_text_no_call_reports_finish_reason() {
        let empty = crate::providers::Candidate::new(Content::new(Role::Model, Vec::new()))
            .with_finish_reason(FinishReason::MaxTokens);
        let backend = Arc::new(MockBackend::new(NoOpLogger::shared()).then(ModelResponse {
            candidates: vec![empty],
            ..Default::default()
        }));
        let orch = orchestrator(backend, vec![Arc::new(fs_server())]);

        let result = orch.run_turn("hi", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::NoActionableResponse);
        assert!(result.final_text.contains("MAX_TOKENS"));
        assert_eq!(roles(&result.history), vec![Role::User, Role::Model]);
    }

    #[tokio::test]
    async fn test_not_ready() {
        let logger = Arc::new(MemoryLogger::new());
        let prior = vec![Content::user("earlier")];

        let no_tools = TurnOrchestrator::new(logger.clone())
            .with_backend(Arc::new(MockBackend::new(logger.clone())));
        let result = no_tools.run_turn("hi", &prior, &TurnOptions::new()).await;
        assert_eq!(result.status, TurnStatus::NotReady);
        assert_eq!(result.history, prior);
        assert_eq!(result.final_text, "Error: Tool servers not ready.");

        let no_backend = TurnOrchestrator::new(logger.clone())
            .with_registry(Arc::new(ToolRegistry::new(Vec::new(), logger.clone())));
        let result = no_backend.run_turn("hi", &prior, &TurnOptions::new()).await;
        assert_eq!(result.status, TurnStatus::NotReady);
        assert_eq!(result.history, prior);
        assert!(logger.contains("before the model backend was set"));
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected() {
        let backend = Arc::new(MockBackend::new(NoOpLogger::shared()));
        let orch = orchestrator(backend.clone(), vec![Arc::new(fs_server())]);

        let result = orch.run_turn("   ", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::Failed);
        assert!(result.history.is_empty());
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_ends_turn() {
        let backend = Arc::new(MockBackend::new(NoOpLogger::shared()).then_error("quota exceeded"));
        let orch = orchestrator(backend, vec![Arc::new(fs_server())]);

        let result = orch.run_turn("hi", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::Failed);
        assert_eq!(result.final_text, "An unexpected server error occurred: quota exceeded");
        assert_eq!(result.history.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let backend = Arc::new(MockBackend::new(NoOpLogger::shared()));
        let orch = orchestrator(backend.clone(), vec![Arc::new(fs_server())]);
        let token = CancellationToken::new();
        token.cancel();

        let result = orch
            .run_turn("hi", &[], &TurnOptions::new().with_cancel(token))
            .await;

        assert_eq!(result.status, TurnStatus::Cancelled);
        assert_eq!(result.final_text, "Turn cancelled.");
        assert_eq!(backend.request_count(), 0);
        assert_eq!(result.history, vec![Content::user("hi")]);
    }

    #[tokio::test]
    async fn test_cancelled_between_iterations() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let server = LocalToolServer::new("ctl").with_tool(ToolDescriptor::new("stop", ""), move |_| {
            trigger.cancel();
            Ok(ToolOutput::Text("stopping".into()))
        });
        let backend = Arc::new(
            MockBackend::new(NoOpLogger::shared())
                .then_call("stop", json!({}))
                .then_text("never sent"),
        );
        let orch = orchestrator(backend.clone(), vec![Arc::new(server)]);

        let result = orch
            .run_turn("stop please", &[], &TurnOptions::new().with_cancel(token))
            .await;

        assert_eq!(result.status, TurnStatus::Cancelled);
        assert_eq!(backend.request_count(), 1);
        assert_eq!(result.tool_calls, 1);
        assert!(tool_results_are_paired(&result.history));
    }

    #[tokio::test]
    async fn test_history_prefix_preserved() {
        let backend = Arc::new(
            MockBackend::new(NoOpLogger::shared())
                .then_call("list_dir", json!({"path": "/tmp"}))
                .then_text("done"),
        );
        let orch = orchestrator(backend.clone(), vec![Arc::new(fs_server())]);
        let prior = vec![Content::user("hi"), Content::model_text("hello")];

        let result = orch.run_turn("list /tmp", &prior, &TurnOptions::new()).await;

        assert_eq!(&result.history[..prior.len()], &prior[..]);
        assert_eq!(result.history[prior.len()], Content::user("list /tmp"));
        assert_eq!(result.history.len(), prior.len() + 4);
        assert_eq!(backend.requests()[0].history.len(), prior.len() + 1);
    }

    #[tokio::test]
    async fn test_only_first_call_is_honored() {
        let server = Arc::new(
            LocalToolServer::new("multi")
                .with_text_tool("first", "1")
                .with_text_tool("second", "2"),
        );
        let backend = Arc::new(
            MockBackend::new(NoOpLogger::shared())
                .then(ModelResponse::from_content(Content::new(
                    Role::Model,
                    vec![
                        Part::FunctionCall(FunctionCall::new("first", json!({}))),
                        Part::FunctionCall(FunctionCall::new("second", json!({}))),
                    ],
                )))
                .then_text("done"),
        );
        let orch = orchestrator(backend, vec![server.clone()]);

        let result = orch.run_turn("both", &[], &TurnOptions::new()).await;

        assert_eq!(server.calls(), vec![("first".to_string(), json!({}))]);
        assert_eq!(result.tool_calls, 1);
        assert_eq!(result.history[2].parts.len(), 1);
        assert_eq!(result.history[2].parts[0].as_function_response().unwrap().name, "first");
    }

    #[tokio::test]
    async fn test_no_servers_warns_but_answers() {
        let backend = Arc::new(MockBackend::fixed("hello", NoOpLogger::shared()));
        let orch = orchestrator(backend.clone(), Vec::new());

        let result = orch.run_turn("hi", &[], &TurnOptions::new()).await;

        assert_eq!(result.status, TurnStatus::Answered);
        assert!(result
            .steps
            .contains(&"Warning: Tool servers may not be available.".to_string()));
        assert!(backend.requests()[0].tool_names.is_empty());
    }

    #[tokio::test]
    async fn test_progress_is_forwarded() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);
        let options = TurnOptions::new().with_progress(Progress::new(Arc::new(move |m: &str| {
            sink.lock().push(m.to_string())
        })));
        let backend = Arc::new(MockBackend::fixed("hello", NoOpLogger::shared()));
        let orch = orchestrator(backend, vec![Arc::new(fs_server())]);

        let result = orch.run_turn("hi", &[], &options).await;

        assert_eq!(*seen.lock(), result.steps);
        assert_eq!(result.steps[0], "Processing prompt: 'hi'");
    }

    #[tokio::test]
    async fn test_discovery_runs_once_per_turn() {
        let server = Arc::new(fs_server());
        let backend = Arc::new(
            MockBackend::new(NoOpLogger::shared())
                .then_call("list_dir", json!({"path": "/tmp"}))
                .then_call("list_dir", json!({"path": "/tmp"}))
                .then_text("done"),
        );
        let orch = orchestrator(backend.clone(), vec![server]);

        let result = orch.run_turn("twice", &[], &TurnOptions::new()).await;

        let listings = result
            .steps
            .iter()
            .filter(|s| s.as_str() == "Listing tools from all tool servers...")
            .count();
        assert_eq!(listings, 1);
        assert_eq!(result.tool_calls, 2);
    }
}
