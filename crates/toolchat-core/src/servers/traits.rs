//! Tool server adapter seam

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::logging::{Logger, NoOpLogger};
use crate::mcp::McpError;
use crate::types::{FunctionDeclaration, ToolDescriptor, ToolOutput};

/// A tool server operation that could not be completed
#[derive(Error, Debug)]
#[error("tool server '{server_id}' failed: {source}")]
pub struct ToolServerError {
    pub server_id: String,
    #[source]
    pub source: McpError,
}

impl ToolServerError {
    pub fn new(server_id: impl Into<String>, source: McpError) -> Self {
        Self {
            server_id: server_id.into(),
            source,
        }
    }
}

pub type ToolCallOutcome = Result<ToolOutput, ToolServerError>;

/// One external tool provider
///
/// Implementations never let a connection or protocol failure escape:
/// discovery degrades to an empty catalog and calls return a
/// `ToolServerError` value.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Server identifier (e.g., "filesystem")
    fn id(&self) -> &str;

    /// Fetch the live catalog and replace the cached one.
    ///
    /// On failure the cache is cleared and an empty list returned.
    async fn list_tools(&self) -> Vec<ToolDescriptor>;

    /// Invoke `name` with `arguments`
    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallOutcome;

    /// Catalog from the most recent `list_tools`
    fn cached_tools(&self) -> Arc<Vec<ToolDescriptor>>;

    /// Cached catalog as function declarations
    fn format_for_model(&self) -> Vec<FunctionDeclaration> {
        format_declarations(self.id(), &self.cached_tools(), &NoOpLogger)
    }

    /// Whether the cached catalog contains `name`
    fn has_tool(&self, name: &str) -> bool {
        self.cached_tools().iter().any(|t| t.name == name)
    }
}

/// Convert descriptors to declarations, skipping (and logging) any that fail.
pub fn format_declarations(
    server_id: &str,
    tools: &[ToolDescriptor],
    logger: &dyn Logger,
) -> Vec<FunctionDeclaration> {
    tools
        .iter()
        .filter_map(|tool| match FunctionDeclaration::from_descriptor(tool, logger) {
            Ok(decl) => Some(decl),
            Err(e) => {
                logger.error(&format!(
                    "[{}] Skipping tool '{}': {}",
                    server_id, tool.name, e
                ));
                None
            }
        })
        .collect()
}
