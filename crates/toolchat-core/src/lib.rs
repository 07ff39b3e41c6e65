//! Toolchat Core
//!
//! A tool-augmented chat turn engine. A language model is offered the tools
//! exposed by a set of MCP tool servers; each user turn runs a bounded
//! function-calling loop until the model answers in text.
//!
//! ## Turn Orchestration
//!
//! ```rust,ignore
//! use toolchat_core::{
//!     AppConfig, FileConfigProvider, McpToolServer, ToolRegistry, TurnOptions, TurnOrchestrator,
//! };
//!
//! let config = AppConfig::load_from(&FileConfigProvider::user()).await?;
//! config.ensure_valid()?;
//!
//! let servers = McpToolServer::from_configs(&config.tool_server_configs(), config.server_timeouts(), logger.clone());
//! let orchestrator = TurnOrchestrator::new(logger.clone())
//!     .with_backend(create_backend("genai", config.model.api_key.clone(), logger.clone()))
//!     .with_registry(Arc::new(ToolRegistry::new(servers, logger.clone())))
//!     .with_settings(config.turn_settings(logger.as_ref()));
//!
//! let result = orchestrator.run_turn("list files in /tmp", &history, &TurnOptions::new()).await;
//! println!("{}", result.final_text);
//! ```

pub mod types;
pub mod logging;
pub mod schema;
pub mod mcp;
pub mod servers;
pub mod tools;
pub mod providers;
pub mod orchestrator;
pub mod history;
pub mod config;

// Re-export commonly used types
pub use types::{
    CancellationToken, Content, FunctionCall, FunctionDeclaration, FunctionResponse, Part,
    Progress, Role, ToolDescriptor, ToolOutput,
};

pub use logging::{ConsoleLogger, Logger, MemoryLogger, NoOpLogger, SharedLogger};

pub use config::{AppConfig, ConfigError, ConfigProvider, FileConfigProvider, MemoryConfigProvider};

pub use servers::{
    LocalToolServer, McpToolServer, ServerTimeouts, ToolServer, ToolServerConfig,
    ToolServerTransport,
};

pub use tools::{ToolCatalog, ToolRegistry};

pub use providers::{
    create_backend, BackendError, GenaiBackend, GenerateOptions, MockBackend, ModelBackend,
    ModelResponse,
};

pub use orchestrator::{TurnOptions, TurnOrchestrator, TurnResult, TurnSettings, TurnStatus};

pub use history::{
    FileHistoryStore, HistoryManager, HistorySettings, HistoryStore, MemoryHistoryStore,
    SessionRecord,
};

// MCP client using official rmcp SDK
pub use mcp::{McpClient, McpError, McpResult};
