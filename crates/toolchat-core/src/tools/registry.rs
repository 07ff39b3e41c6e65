//! Tool registry
//!
//! Fans discovery out across every configured tool server, merges the
//! catalogs into one declaration list and builds the name -> server index
//! used for dispatch. A catalog is a per-turn snapshot; nothing is cached
//! here between turns.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;

use crate::logging::SharedLogger;
use crate::servers::ToolServer;
use crate::types::{FunctionDeclaration, Progress, ToolDescriptor};

/// Declarations and dispatch index from one discovery pass
#[derive(Clone, Default)]
pub struct ToolCatalog {
    declarations: Vec<FunctionDeclaration>,
    index: HashMap<String, Arc<dyn ToolServer>>,
}

impl ToolCatalog {
    /// Declarations to offer the model
    pub fn declarations(&self) -> &[FunctionDeclaration] {
        &self.declarations
    }

    /// Server owning `name`, if any
    pub fn dispatch(&self, name: &str) -> Option<Arc<dyn ToolServer>> {
        self.index.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Declared tool names, in offer order
    pub fn tool_names(&self) -> Vec<&str> {
        self.declarations.iter().map(|d| d.name.as_str()).collect()
    }
}

impl fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index: HashMap<&str, &str> = self
            .index
            .iter()
            .map(|(name, server)| (name.as_str(), server.id()))
            .collect();
        f.debug_struct("ToolCatalog")
            .field("declarations", &self.tool_names())
            .field("index", &index)
            .finish()
    }
}

/// The set of tool servers available to the orchestrator
///
/// Server order matters: when two servers expose the same tool name the
/// one registered first owns it.
pub struct ToolRegistry {
    servers: Vec<Arc<dyn ToolServer>>,
    logger: SharedLogger,
}

impl ToolRegistry {
    pub fn new(servers: Vec<Arc<dyn ToolServer>>, logger: SharedLogger) -> Self {
        Self { servers, logger }
    }

    pub fn servers(&self) -> &[Arc<dyn ToolServer>] {
        &self.servers
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Query every server concurrently and build a fresh catalog.
    ///
    /// A server that fails (or panics) contributes nothing; the others are
    /// unaffected.
    pub async fn discover(&self, progress: &Progress) -> ToolCatalog {
        if self.servers.is_empty() {
            self.logger.warn("[ToolRegistry] No tool servers configured");
            return ToolCatalog::default();
        }

        progress.step("Listing tools from all tool servers...");

        let tasks = self.servers.iter().map(|server| {
            let server = Arc::clone(server);
            tokio::spawn(async move { server.list_tools().await })
        });
        let results = join_all(tasks).await;

        let mut catalog = ToolCatalog::default();
        for (server, result) in self.servers.iter().zip(results) {
            let listed = match result {
                Ok(tools) => tools,
                Err(e) => {
                    self.logger.error(&format!(
                        "[ToolRegistry] Discovery task for '{}' aborted: {}",
                        server.id(),
                        e
                    ));
                    progress.step(&format!("Error contacting tool server '{}'.", server.id()));
                    continue;
                }
            };

            if listed.is_empty() {
                progress.step(&format!("No tools found from '{}'.", server.id()));
                continue;
            }

            let added = self.merge(&mut catalog, server);
            progress.step(&format!("Found {} tools from '{}'.", added, server.id()));
        }

        if catalog.is_empty() {
            self.logger.warn("[ToolRegistry] No tools available from any server");
            progress.step("Warning: No tools available from any tool server.");
        } else {
            self.logger.info(&format!(
                "[ToolRegistry] Discovered {} tools from {} servers",
                catalog.len(),
                self.servers.len()
            ));
        }

        catalog
    }

    /// Add one server's cached catalog. Returns how many declarations it contributed.
    fn merge(&self, catalog: &mut ToolCatalog, server: &Arc<dyn ToolServer>) -> usize {
        let mut added = 0;
        for decl in server.format_for_model() {
            if let Some(owner) = catalog.index.get(&decl.name) {
                self.logger.warn(&format!(
                    "[ToolRegistry] Tool '{}' from '{}' shadowed by '{}'",
                    decl.name,
                    server.id(),
                    owner.id()
                ));
                continue;
            }
            catalog.index.insert(decl.name.clone(), Arc::clone(server));
            catalog.declarations.push(decl);
            added += 1;
        }

        // Tools that could not be declared are still reachable by name.
        for ToolDescriptor { name, .. } in server.cached_tools().iter() {
            catalog
                .index
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(server));
        }

        added
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.servers.iter().map(|s| s.id()).collect();
        f.debug_struct("ToolRegistry").field("servers", &ids).finish()
    }
}
