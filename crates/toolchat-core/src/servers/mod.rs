//! Tool server adapters
//!
//! A `ToolServer` wraps one external tool provider. `McpToolServer` reaches
//! the provider through MCP, opening a fresh session for every operation;
//! `LocalToolServer` serves closures in-process.

mod config;
mod traits;
mod mcp_server;
mod local;

pub use config::{ToolServerConfig, ToolServerTransport};
pub use traits::{format_declarations, ToolCallOutcome, ToolServer, ToolServerError};
pub use mcp_server::{McpToolServer, ServerTimeouts};
pub use local::{LocalMode, LocalToolServer, ToolHandler};
