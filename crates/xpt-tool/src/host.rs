//! Tool registry
//!
//! Stands in for the plugin host: tools are registered explicitly at
//! startup, looked up by name, fed incoming data and disposed on shutdown.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::HostError;
use crate::tool::{DataPayload, GuiTool, ToolDescriptor};

/// Registered tools, in registration order
#[derive(Default)]
pub struct ToolHost {
    tools: RwLock<IndexMap<&'static str, Arc<dyn GuiTool>>>,
}

impl std::fmt::Debug for ToolHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHost")
            .field("tools", &self.tools.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolHost {
    /// Create new empty host
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool` under its descriptor name
    ///
    /// # Errors
    ///
    /// Returns [`HostError::DuplicateTool`] if the name is taken.
    pub fn register(&self, tool: Arc<dyn GuiTool>) -> Result<(), HostError> {
        let name = tool.descriptor().name;
        let mut tools = self.tools.write();
        if tools.contains_key(name) {
            return Err(HostError::DuplicateTool(name.to_string()));
        }
        tools.insert(name, tool);
        tracing::info!("registered tool {}", name);
        Ok(())
    }

    /// Tool registered as `name`
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownTool`] if nothing is registered under it.
    pub fn get(&self, name: &str) -> Result<Arc<dyn GuiTool>, HostError> {
        self.tools
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::UnknownTool(name.to_string()))
    }

    /// Descriptors of every registered tool
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .read()
            .values()
            .map(|tool| tool.descriptor().clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    /// Hand `payload` to every tool; each decides whether it applies
    pub fn deliver_data(&self, data_type: &str, payload: &DataPayload) {
        let tools: Vec<Arc<dyn GuiTool>> = self.tools.read().values().cloned().collect();
        tracing::debug!(data_type, tools = tools.len(), "delivering data");
        for tool in tools {
            tool.on_data_received(data_type, payload);
        }
    }

    /// Dispose and unregister every tool
    pub fn shutdown(&self) {
        let tools = std::mem::take(&mut *self.tools.write());
        for (name, tool) in tools {
            tool.dispose();
            tracing::debug!("disposed tool {}", name);
        }
    }
}
