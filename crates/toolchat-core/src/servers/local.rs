//! In-process tool server
//!
//! Serves tools implemented as Rust closures. Useful for built-in tools and
//! for exercising discovery and dispatch without spawning subprocesses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::mcp::McpError;
use crate::types::{ToolDescriptor, ToolOutput};

use super::traits::{ToolCallOutcome, ToolServer, ToolServerError};

/// Tool implementation; `Err` is reported as a failed call
pub type ToolHandler = Arc<dyn Fn(Value) -> Result<ToolOutput, String> + Send + Sync>;

/// Availability of a local server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalMode {
    #[default]
    Healthy,
    /// Every operation fails as if the server could not be reached
    Unreachable,
}

/// Tool server whose tools run in-process
pub struct LocalToolServer {
    id: String,
    tools: Vec<(ToolDescriptor, ToolHandler)>,
    cache: RwLock<Arc<Vec<ToolDescriptor>>>,
    mode: LocalMode,
    latency: Duration,
    calls: Mutex<Vec<(String, Value)>>,
}

impl LocalToolServer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tools: Vec::new(),
            cache: RwLock::new(Arc::new(Vec::new())),
            mode: LocalMode::Healthy,
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register a tool
    pub fn with_tool<F>(mut self, descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(Value) -> Result<ToolOutput, String> + Send + Sync + 'static,
    {
        self.tools.push((descriptor, Arc::new(handler)));
        self
    }

    /// Register a tool that always returns the same text
    pub fn with_text_tool(self, name: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        self.with_tool(ToolDescriptor::new(name, format!("Returns a fixed answer for {}", name)), move |_| {
            Ok(ToolOutput::Text(text.clone()))
        })
    }

    pub fn unreachable(mut self) -> Self {
        self.mode = LocalMode::Unreachable;
        self
    }

    /// Delay applied to every operation
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    fn unreachable_error(&self) -> ToolServerError {
        ToolServerError::new(
            self.id.clone(),
            McpError::ConnectionFailed(format!("local server '{}' is unreachable", self.id)),
        )
    }
}

#[async_trait]
impl ToolServer for LocalToolServer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_tools(&self) -> Vec<ToolDescriptor> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let tools: Vec<ToolDescriptor> = match self.mode {
            LocalMode::Healthy => self.tools.iter().map(|(d, _)| d.clone()).collect(),
            LocalMode::Unreachable => Vec::new(),
        };
        *self.cache.write() = Arc::new(tools.clone());
        tools
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallOutcome {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.lock().push((name.to_string(), arguments.clone()));

        if self.mode == LocalMode::Unreachable {
            return Err(self.unreachable_error());
        }

        let handler = self
            .tools
            .iter()
            .find(|(d, _)| d.name == name)
            .map(|(_, h)| Arc::clone(h))
            .ok_or_else(|| {
                ToolServerError::new(
                    self.id.clone(),
                    McpError::ToolCallFailed(format!("unknown tool '{}'", name)),
                )
            })?;

        handler(arguments)
            .map_err(|msg| ToolServerError::new(self.id.clone(), McpError::ToolCallFailed(msg)))
    }

    fn cached_tools(&self) -> Arc<Vec<ToolDescriptor>> {
        Arc::clone(&self.cache.read())
    }
}
