//! Turn orchestrator
//!
//! Drives one user turn: discover tools, call the model, run at most one
//! requested function per iteration, feed the result back, and stop on a
//! text answer, an error, cancellation, or the iteration ceiling.
//!
//! ```text
//! AwaitingModel ──► FunctionCallRequested ──► ToolExecuted ──┐
//!      ▲                                                     │
//!      └─────────────────────────────────────────────────────┘
//! AwaitingModel ──► TextProduced ──► Done
//! AwaitingModel ──► Error ──► Done
//! ```

mod settings;
mod state;
mod turn;

pub use settings::{
    TurnSettings, DEFAULT_LOG_PREVIEW_LEN, DEFAULT_MAX_FUNCTION_CALLS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE,
};
pub use state::{TurnOptions, TurnResult, TurnStatus};
pub use turn::TurnOrchestrator;
