use async_trait::async_trait;
use serde_json::Value;

use super::handler::{ToolEntry, ToolHandler};
use super::server::ToolServer;
use crate::error::ToolServerError;
use crate::types::ToolDescriptor;

/// In-process tool server. Lists its tools in registration order and runs
/// them through their handlers.
pub struct ToolCatalog {
    name: String,
    tools: Vec<ToolEntry>,
}

impl ToolCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
        }
    }

    /// Register a tool. Names are not de-duplicated.
    pub fn add(mut self, descriptor: ToolDescriptor, handler: impl ToolHandler + 'static) -> Self {
        self.tools.push(ToolEntry {
            descriptor,
            handler: Box::new(handler),
        });
        self
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.find(name).map(|t| &t.descriptor)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.descriptor.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    fn find(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }
}

#[async_trait]
impl ToolServer for ToolCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolServerError> {
        Ok(self.tools.iter().map(|t| t.descriptor.clone()).collect())
    }

    async fn call_tool(&self, name: &str, input: &Value) -> Result<String, ToolServerError> {
        let tool = self
            .find(name)
            .ok_or_else(|| ToolServerError::UnknownTool(name.to_string()))?;
        tool.handler
            .call(input)
            .await
            .map_err(|message| ToolServerError::Call {
                tool: name.to_string(),
                message,
            })
    }
}
