//! Turn state machine types

use serde::{Deserialize, Serialize};

use crate::types::{CancellationToken, Content, FunctionCall, Progress};

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The model produced a text answer
    Answered,
    /// The model stopped with neither text nor a function call
    NoActionableResponse,
    /// The iteration ceiling was hit; the text carries a warning
    LimitReached,
    /// Setup, backend or response-shape error
    Failed,
    Cancelled,
    /// Backend or tool servers were never provided
    NotReady,
}

impl TurnStatus {
    /// Whether the final text is a model-composed answer
    pub fn is_answer(&self) -> bool {
        matches!(self, TurnStatus::Answered | TurnStatus::LimitReached)
    }
}

/// Per-turn knobs supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    pub progress: Progress,
    pub cancel: Option<CancellationToken>,
}

impl TurnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Outcome of `run_turn`
///
/// The caller always gets a text (an answer or a diagnostic) and a history it
/// can persist.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub final_text: String,
    pub history: Vec<Content>,
    pub status: TurnStatus,
    /// Function calls handled this turn, including unknown and failed ones
    pub tool_calls: usize,
    /// Progress messages emitted during the turn, in order
    pub steps: Vec<String>,
}

/// States of one turn
#[derive(Debug)]
pub(crate) enum TurnState {
    AwaitingModel,
    FunctionCallRequested(FunctionCall),
    ToolExecuted,
    TextProduced(String),
    Error { status: TurnStatus, message: String },
    Done { status: TurnStatus, text: String },
}
