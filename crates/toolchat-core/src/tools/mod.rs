//! Tool registry
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ToolRegistry                                │
//! │    discover() ── list_tools() per server,    │
//! │                  concurrently                │
//! │            │                                 │
//! │            ▼                                 │
//! │  ToolCatalog (one per turn)                  │
//! │    - declarations offered to the model       │
//! │    - tool name → owning ToolServer           │
//! └──────────────────────────────────────────────┘
//!            │ dispatch(name)
//!            ▼
//! ┌──────────────────────────────────────────────┐
//! │  ToolServer (MCP subprocess, HTTP, local)    │
//! └──────────────────────────────────────────────┘
//! ```

mod registry;

pub use registry::{ToolCatalog, ToolRegistry};
