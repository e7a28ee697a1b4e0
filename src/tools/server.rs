use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::{AgentIdentity, FilterContext};
use crate::engine::ToolFilterEngine;
use crate::error::ToolServerError;
use crate::filter::FilterConfig;
use crate::types::ToolDescriptor;

/// Something that enumerates and runs tools, such as a connected MCP server.
#[async_trait]
pub trait ToolServer: Send + Sync {
    fn name(&self) -> &str;

    /// Every tool the server offers, in the server's order.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolServerError>;

    async fn call_tool(&self, name: &str, input: &Value) -> Result<String, ToolServerError>;
}

#[async_trait]
impl<S: ToolServer + ?Sized> ToolServer for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolServerError> {
        (**self).list_tools().await
    }

    async fn call_tool(&self, name: &str, input: &Value) -> Result<String, ToolServerError> {
        (**self).call_tool(name, input).await
    }
}

/// A tool server seen through a filter. Listing and calling are both
/// scoped to a [`FilterContext`], so one server can be shared by agents
/// with different permissions.
pub struct FilteredToolServer<S> {
    server: S,
    config: FilterConfig,
    engine: ToolFilterEngine,
}

impl<S: ToolServer> FilteredToolServer<S> {
    pub fn new(server: S, config: impl Into<FilterConfig>) -> Self {
        Self {
            server,
            config: config.into(),
            engine: ToolFilterEngine::new(),
        }
    }

    pub fn with_engine(mut self, engine: ToolFilterEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn name(&self) -> &str {
        self.server.name()
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Start a context for an agent run against this server.
    pub fn context_for(&self, agent: AgentIdentity) -> FilterContext {
        FilterContext::new(agent, self.server.name())
    }

    /// Tools visible to this run. Filter failures are returned as errors.
    pub async fn list_tools_for(
        &self,
        context: &FilterContext,
    ) -> Result<Vec<ToolDescriptor>, ToolServerError> {
        let tools = self.server.list_tools().await?;
        Ok(self.engine.filter(tools, &self.config, context).await?)
    }

    /// Like [`list_tools_for`](Self::list_tools_for), abandoned if the run is cancelled.
    pub async fn list_tools_with_cancel(
        &self,
        context: &FilterContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolDescriptor>, ToolServerError> {
        let tools = self.server.list_tools().await?;
        Ok(self
            .engine
            .filter_with_cancel(tools, &self.config, context, cancel)
            .await?)
    }

    /// Tools visible to this run, fail-closed: any error is logged and the
    /// run gets no tools from this server.
    pub async fn tools_for_run(&self, context: &FilterContext) -> Vec<ToolDescriptor> {
        match self.list_tools_for(context).await {
            Ok(tools) => tools,
            Err(e) => {
                warn!(
                    server = %self.server.name(),
                    agent = %context.agent.name,
                    error = %e,
                    "no tools exposed for this run"
                );
                Vec::new()
            }
        }
    }

    /// JSON tool definitions for an LLM request, fail-closed.
    pub async fn schemas_for(&self, context: &FilterContext) -> Vec<Value> {
        self.tools_for_run(context)
            .await
            .iter()
            .map(ToolDescriptor::schema)
            .collect()
    }

    /// Keyword search over the tools visible to this run, matching name and
    /// description. Returns compact `{name, description}` summaries. Hidden
    /// tools never match; a failed filter matches nothing.
    pub async fn search_for(&self, context: &FilterContext, query: &str) -> Vec<Value> {
        let query = query.to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();

        self.tools_for_run(context)
            .await
            .into_iter()
            .filter(|tool| {
                let haystack = format!(
                    "{} {}",
                    tool.name.to_lowercase(),
                    tool.description.as_deref().unwrap_or("").to_lowercase()
                );
                terms.iter().any(|term| haystack.contains(term))
            })
            .map(|tool| json!({ "name": tool.name, "description": tool.description }))
            .collect()
    }

    /// Run a tool on behalf of an agent. Tools hidden from the agent are
    /// refused without reaching the server.
    pub async fn call_tool_for(
        &self,
        context: &FilterContext,
        name: &str,
        input: &Value,
    ) -> Result<String, ToolServerError> {
        let visible = self.list_tools_for(context).await?;
        if !visible.iter().any(|t| t.name == name) {
            info!(
                server = %self.server.name(),
                agent = %context.agent.name,
                tool = name,
                "refused call to filtered tool"
            );
            return Err(ToolServerError::ToolNotVisible {
                tool: name.to_string(),
                agent: context.agent.name.clone(),
            });
        }
        self.server.call_tool(name, input).await
    }
}
