use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A tool as enumerated by a tool server: name plus the metadata the model sees.
///
/// Serializes to the JSON tool definition shape used in LLM requests:
/// `{ "name", "description", "input_schema" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: empty_object_schema(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Parse a JSON tool definition. Returns `None` when `name` is missing.
    pub fn from_schema(schema: &Value) -> Option<Self> {
        let name = schema["name"].as_str()?;
        Some(Self {
            name: name.to_string(),
            description: schema["description"].as_str().map(str::to_string),
            input_schema: schema
                .get("input_schema")
                .cloned()
                .unwrap_or_else(empty_object_schema),
        })
    }

    /// The JSON tool definition sent to the model.
    pub fn schema(&self) -> Value {
        let mut schema = json!({
            "name": self.name,
            "input_schema": self.input_schema,
        });
        if let Some(ref description) = self.description {
            schema["description"] = Value::String(description.clone());
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_definition() {
        let tool = ToolDescriptor::from_schema(&json!({
            "name": "read_file",
            "description": "Read a file",
            "input_schema": {"type": "object", "properties": {"path": {"type": "string"}}}
        }))
        .unwrap();

        assert_eq!(tool.name, "read_file");
        assert_eq!(tool.description.as_deref(), Some("Read a file"));
        assert!(tool.input_schema["properties"]["path"].is_object());
    }

    #[test]
    fn missing_name_is_rejected() {
        assert!(ToolDescriptor::from_schema(&json!({"description": "nameless"})).is_none());
    }

    #[test]
    fn schema_defaults_to_empty_object() {
        let tool = ToolDescriptor::from_schema(&json!({"name": "list_directory"})).unwrap();
        assert_eq!(tool.input_schema["type"], "object");
        assert!(tool.description.is_none());

        let schema = tool.schema();
        assert_eq!(schema["name"], "list_directory");
        assert!(schema.get("description").is_none());
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let tool: ToolDescriptor = serde_json::from_str(r#"{"name": "delete_file"}"#).unwrap();
        assert_eq!(tool, ToolDescriptor::new("delete_file"));
    }
}
