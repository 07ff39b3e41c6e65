//! MCP client using the official rmcp SDK
//!
//! Every client owns one live session. Tool server adapters open a client,
//! run one operation and close it again.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation, Tool,
    },
    service::RunningService,
    transport::{StreamableHttpClientTransport, TokioChildProcess},
    RoleClient, ServiceExt,
};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;

use crate::logging::Logger;
use crate::servers::ToolServerTransport;
use crate::types::ToolDescriptor;

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Failed to launch '{command}': {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type McpResult<T> = Result<T, McpError>;

/// MCP client for one tool server session
pub struct McpClient {
    /// The underlying rmcp running service
    client: RunningService<RoleClient, ClientInfo>,
    logger: Arc<dyn Logger>,
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolchat-core".to_string(),
            title: Some("Toolchat".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

impl McpClient {
    /// Connect and run the initialization handshake
    pub async fn connect(transport: &ToolServerTransport, logger: Arc<dyn Logger>) -> McpResult<Self> {
        match transport {
            ToolServerTransport::Stdio { command, args, env } => {
                let mut cmd = Command::new(command);
                cmd.args(args)
                    .envs(env.iter())
                    .stderr(Stdio::null())
                    .kill_on_drop(true);
                Self::connect_child(command, cmd, logger).await
            }
            ToolServerTransport::Http { url } => Self::connect_http(url, logger).await,
        }
    }

    /// Launch a tool server subprocess and talk to it over stdio
    pub async fn connect_child(command: &str, cmd: Command, logger: Arc<dyn Logger>) -> McpResult<Self> {
        logger.debug(&format!("[McpClient] Launching: {}", command));

        let transport = TokioChildProcess::new(cmd).map_err(|source| McpError::LaunchFailed {
            command: command.to_string(),
            source,
        })?;

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        logger.debug("[McpClient] Connected and initialized successfully");

        Ok(Self { client, logger })
    }

    /// Connect to an MCP server over HTTP (Streamable HTTP transport)
    pub async fn connect_http(url: &str, logger: Arc<dyn Logger>) -> McpResult<Self> {
        logger.debug(&format!("[McpClient] Connecting to HTTP: {}", url));

        let transport = StreamableHttpClientTransport::from_uri(url.to_string());

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        logger.debug("[McpClient] Connected and initialized successfully");

        Ok(Self { client, logger })
    }

    /// List every tool the server advertises, following pagination
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let tools = self
            .client
            .list_all_tools()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger.debug(&format!("[McpClient] Listed {} tools", tools.len()));

        Ok(tools)
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<CallToolResult> {
        self.logger.debug(&format!("[McpClient] Calling tool: {}", name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        self.client
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))
    }

    /// Close the session; for stdio servers this also ends the child process
    pub async fn close(self) -> McpResult<()> {
        self.logger.debug("[McpClient] Closing connection");
        self.client
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }
}

impl From<Tool> for ToolDescriptor {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|s| s.to_string()).unwrap_or_default(),
            // input_schema is Arc<JsonObject>, convert to Value
            input_schema: serde_json::to_value(tool.input_schema.as_ref()).unwrap_or_default(),
        }
    }
}
