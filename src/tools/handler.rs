use async_trait::async_trait;
use serde_json::Value;

use crate::types::ToolDescriptor;

/// Runs one tool of an in-process [`ToolCatalog`](super::ToolCatalog).
/// Errors come back as plain messages, the way a tool server reports them.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, input: &Value) -> Result<String, String>;
}

/// A catalog entry: what the server advertises plus what runs on a call.
pub struct ToolEntry {
    pub descriptor: ToolDescriptor,
    pub(crate) handler: Box<dyn ToolHandler>,
}
