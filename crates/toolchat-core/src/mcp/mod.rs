//! MCP (Model Context Protocol) client module
//!
//! Uses the official rmcp SDK to talk to tool servers, either launched as a
//! child process over stdio or reached over streamable HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolchat_core::mcp::McpClient;
//! use toolchat_core::servers::ToolServerTransport;
//!
//! let transport = ToolServerTransport::stdio("npx", ["-y", "@modelcontextprotocol/server-memory"]);
//! let client = McpClient::connect(&transport, logger).await?;
//!
//! let tools = client.list_tools().await?;
//! let result = client.call_tool("read_graph", json!({})).await?;
//! client.close().await?;
//! ```

mod client;

pub use client::{McpClient, McpError, McpResult};
