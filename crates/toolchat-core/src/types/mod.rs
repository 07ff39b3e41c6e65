//! Core types shared by every component
//!
//! - conversation history (`Content`, `Part`, `Role`)
//! - tool catalog entries and tool results
//! - cooperative cancellation and progress reporting

mod message;
mod tool;
mod cancellation;
mod progress;

pub use message::{tool_results_are_paired, Content, FunctionCall, FunctionResponse, Part, Role};
pub use tool::{DeclarationError, FunctionDeclaration, ToolDescriptor, ToolOutput, MAX_FUNCTION_NAME_LEN};
pub use cancellation::CancellationToken;
pub use progress::{Progress, ProgressCallback};
