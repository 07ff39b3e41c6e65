//! Static launch parameters for tool servers

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// How to reach a tool server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum ToolServerTransport {
    /// Launch a subprocess and speak MCP over its stdin/stdout
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// Streamable HTTP endpoint
    Http { url: String },
}

impl ToolServerTransport {
    pub fn stdio<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ToolServerTransport::Stdio {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        ToolServerTransport::Http { url: url.into() }
    }

    /// Command or URL, for log lines
    pub fn target(&self) -> &str {
        match self {
            ToolServerTransport::Stdio { command, .. } => command,
            ToolServerTransport::Http { url } => url,
        }
    }
}

/// Configuration for one tool server, immutable for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolServerConfig {
    /// Unique identifier (e.g., "filesystem", "memory")
    pub id: String,
    #[serde(flatten)]
    pub transport: ToolServerTransport,
    /// Disabled servers are skipped at startup
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ToolServerConfig {
    pub fn new(id: impl Into<String>, transport: ToolServerTransport) -> Self {
        Self {
            id: id.into(),
            transport,
            enabled: true,
        }
    }

    /// Add an environment variable (stdio servers only)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let ToolServerTransport::Stdio { env, .. } = &mut self.transport {
            env.insert(key.into(), value.into());
        }
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The reference filesystem server, scoped to `directories`
    pub fn filesystem<I, P>(directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut args = vec![
            "-y".to_string(),
            "@modelcontextprotocol/server-filesystem".to_string(),
        ];
        args.extend(
            directories
                .into_iter()
                .map(|d| d.as_ref().to_string_lossy().into_owned()),
        );
        Self::new("filesystem", ToolServerTransport::stdio("npx", args))
    }

    /// The reference knowledge-graph memory server, persisting to `memory_file`
    pub fn memory(memory_file: impl AsRef<Path>) -> Self {
        Self::new(
            "memory",
            ToolServerTransport::stdio("npx", ["-y", "@modelcontextprotocol/server-memory"]),
        )
        .with_env(
            "MEMORY_FILE_PATH",
            memory_file.as_ref().to_string_lossy().into_owned(),
        )
    }
}
