//! Tool server adapter backed by an MCP connection per operation
//!
//! No session outlives a single `list_tools` or `call_tool`: each operation
//! connects, initializes, does its one request and disconnects. A crashed or
//! hung server can therefore only fail the operation in flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::logging::{preview, Logger};
use crate::mcp::{McpClient, McpError, McpResult};
use crate::types::{FunctionDeclaration, ToolDescriptor, ToolOutput};

use super::config::ToolServerConfig;
use super::traits::{format_declarations, ToolCallOutcome, ToolServer, ToolServerError};

/// Per-operation time limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTimeouts {
    pub discovery: Duration,
    pub call: Duration,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            discovery: Duration::from_secs(30),
            call: Duration::from_secs(60),
        }
    }
}

/// MCP-backed tool server adapter
pub struct McpToolServer {
    config: ToolServerConfig,
    /// Swapped wholesale so readers never see a partial catalog
    tools: RwLock<Arc<Vec<ToolDescriptor>>>,
    timeouts: ServerTimeouts,
    preview_len: usize,
    logger: Arc<dyn Logger>,
}

impl McpToolServer {
    pub fn new(config: ToolServerConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            tools: RwLock::new(Arc::new(Vec::new())),
            timeouts: ServerTimeouts::default(),
            preview_len: 250,
            logger,
        }
    }

    pub fn with_timeouts(mut self, timeouts: ServerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_preview_len(mut self, len: usize) -> Self {
        self.preview_len = len;
        self
    }

    /// Build adapters for every enabled config, preserving order
    pub fn from_configs(
        configs: &[ToolServerConfig],
        timeouts: ServerTimeouts,
        logger: Arc<dyn Logger>,
    ) -> Vec<Arc<dyn ToolServer>> {
        configs
            .iter()
            .filter(|c| {
                if !c.enabled {
                    logger.info(&format!("[McpToolServer:{}] Disabled, skipping", c.id));
                }
                c.enabled
            })
            .map(|c| {
                Arc::new(McpToolServer::new(c.clone(), Arc::clone(&logger)).with_timeouts(timeouts))
                    as Arc<dyn ToolServer>
            })
            .collect()
    }

    pub fn config(&self) -> &ToolServerConfig {
        &self.config
    }

    fn tag(&self) -> String {
        format!("[McpToolServer:{}]", self.config.id)
    }

    async fn connect(&self) -> McpResult<McpClient> {
        McpClient::connect(&self.config.transport, Arc::clone(&self.logger)).await
    }

    /// Close a finished session; a failure here does not affect the result
    async fn disconnect(&self, client: McpClient) {
        if let Err(e) = client.close().await {
            self.logger.warn(&format!("{} Error while disconnecting: {}", self.tag(), e));
        }
    }

    async fn fetch_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        let client = self.connect().await?;
        let listed = client.list_tools().await;
        self.disconnect(client).await;
        Ok(listed?.into_iter().map(ToolDescriptor::from).collect())
    }

    async fn invoke(&self, name: &str, arguments: Value) -> McpResult<Value> {
        let client = self.connect().await?;
        let called = client.call_tool(name, arguments).await;
        self.disconnect(client).await;
        serde_json::to_value(called?).map_err(|e| McpError::Protocol(e.to_string()))
    }

    fn replace_cache(&self, tools: Vec<ToolDescriptor>) {
        *self.tools.write() = Arc::new(tools);
    }
}

/// Run `op` under `limit`, folding elapsed time into `McpError::Timeout`
async fn with_timeout<T>(limit: Duration, op: impl Future<Output = McpResult<T>>) -> McpResult<T> {
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(McpError::Timeout(limit)),
    }
}

#[async_trait]
impl ToolServer for McpToolServer {
    fn id(&self) -> &str {
        &self.config.id
    }

    async fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.logger.debug(&format!("{} Listing tools...", self.tag()));

        match with_timeout(self.timeouts.discovery, self.fetch_tools()).await {
            Ok(tools) => {
                if tools.is_empty() {
                    self.logger.warn(&format!("{} Server advertised no tools", self.tag()));
                } else {
                    self.logger
                        .info(&format!("{} Found {} tools", self.tag(), tools.len()));
                }
                self.replace_cache(tools.clone());
                tools
            }
            Err(e) => {
                let hint = match &e {
                    McpError::LaunchFailed { .. } => " Is it installed and in PATH?",
                    _ => "",
                };
                self.logger
                    .error(&format!("{} Error listing tools: {}.{}", self.tag(), e, hint));
                self.replace_cache(Vec::new());
                Vec::new()
            }
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallOutcome {
        self.logger.debug(&format!(
            "{} Calling tool '{}' with args: {}",
            self.tag(),
            name,
            preview(&arguments.to_string(), self.preview_len)
        ));

        match with_timeout(self.timeouts.call, self.invoke(name, arguments)).await {
            Ok(raw) => {
                if raw.get("isError").and_then(Value::as_bool) == Some(true) {
                    self.logger
                        .warn(&format!("{} Tool '{}' reported an error result", self.tag(), name));
                }
                let output = ToolOutput::from_call_result(raw);
                self.logger.debug(&format!(
                    "{} Tool '{}' returned {} output",
                    self.tag(),
                    name,
                    output.kind()
                ));
                Ok(output)
            }
            Err(e) => {
                self.logger
                    .error(&format!("{} Error calling tool '{}': {}", self.tag(), name, e));
                Err(ToolServerError::new(self.config.id.clone(), e))
            }
        }
    }

    fn cached_tools(&self) -> Arc<Vec<ToolDescriptor>> {
        Arc::clone(&self.tools.read())
    }

    fn format_for_model(&self) -> Vec<FunctionDeclaration> {
        let tools = self.cached_tools();
        if tools.is_empty() {
            self.logger.debug(&format!("{} No tools cached to format", self.tag()));
        }
        format_declarations(&self.config.id, &tools, self.logger.as_ref())
    }
}

impl std::fmt::Debug for McpToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolServer")
            .field("config", &self.config)
            .field("cached_tools", &self.tools.read().len())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::servers::ToolServerTransport;
    use serde_json::json;

    fn missing_server(logger: Arc<dyn Logger>) -> McpToolServer {
        let config = ToolServerConfig::new(
            "ghost",
            ToolServerTransport::stdio("toolchat-missing-tool-server", ["--stdio"]),
        );
        McpToolServer::new(config, logger)
    }

    #[tokio::test]
    async fn test_list_tools_failure_clears_cache() {
        let logger = Arc::new(MemoryLogger::new());
        let server = missing_server(logger.clone());
        server.replace_cache(vec![ToolDescriptor::new("stale", "left over")]);

        let tools = server.list_tools().await;

        assert!(tools.is_empty());
        assert!(server.cached_tools().is_empty());
        assert!(!server.has_tool("stale"));
        let errors = logger.messages_at(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("toolchat-missing-tool-server"));
        assert!(errors[0].contains("PATH"));
    }

    #[tokio::test]
    async fn test_call_tool_failure_is_a_value() {
        let server = missing_server(NoOpLogger::shared());

        let outcome = server.call_tool("anything", json!({"a": 1})).await;

        let err = outcome.unwrap_err();
        assert_eq!(err.server_id, "ghost");
        assert!(matches!(err.source, McpError::LaunchFailed { .. }));
    }

    #[tokio::test]
    async fn test_with_timeout_maps_elapsed() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, McpError>(())
        };
        let result = with_timeout(Duration::from_millis(10), slow).await;
        match result {
            Err(e @ McpError::Timeout(_)) => assert_eq!(e.to_string(), "Timed out after 10ms"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_format_for_model_uses_cache() {
        let server = missing_server(NoOpLogger::shared());
        server.replace_cache(vec![
            ToolDescriptor::new("list_dir", "List").with_schema(json!({
                "type": "object",
                "properties": {"path": {"type": "string"}}
            })),
        ]);

        let decls = server.format_for_model();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "list_dir");
    }

    #[test]
    fn test_from_configs_skips_disabled() {
        let configs = vec![
            ToolServerConfig::new("a", ToolServerTransport::stdio("a", Vec::<String>::new())),
            ToolServerConfig::new("b", ToolServerTransport::stdio("b", Vec::<String>::new())).disabled(),
            ToolServerConfig::new("c", ToolServerTransport::http("http://localhost:1/mcp")),
        ];
        let servers = McpToolServer::from_configs(&configs, ServerTimeouts::default(), NoOpLogger::shared());
        let ids: Vec<&str> = servers.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
