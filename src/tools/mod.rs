//! Function tools exposed to the realtime model.
//!
//! The registry is static: every tool is declared at construction time with an
//! explicit name, description, JSON schema, and handler. There is no runtime
//! discovery.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;

use crate::realtime::ToolDefinition;

/// Errors surfaced by tool dispatch.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// Async handler invoked when the model calls a tool.
pub type ToolHandler = Arc<
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send>> + Send + Sync,
>;

/// A registered tool: the declaration advertised to the model plus its handler.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's arguments
    pub parameters: Value,
    pub handler: ToolHandler,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Static collection of tools available to a session.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing the builtin tools.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ToolDescriptor {
            name: "get_weather".to_string(),
            description: "Get the current weather conditions for a location. \
                          Call this whenever the user asks about the weather."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "The city or area to get the weather for"
                    }
                },
                "required": ["location"]
            }),
            handler: Arc::new(|args| {
                Box::pin(async move {
                    let location = args
                        .get("location")
                        .and_then(Value::as_str)
                        .ok_or_else(|| ToolError::InvalidArguments {
                            tool: "get_weather".to_string(),
                            reason: "missing string field 'location'".to_string(),
                        })?;
                    Ok(weather_report(location))
                })
            }),
        });
        registry
    }

    pub fn register(&mut self, tool: ToolDescriptor) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Tool declarations in the form advertised to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            })
            .collect()
    }

    /// Invoke a tool by name with the model-provided arguments.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        (tool.handler)(args).await
    }
}

/// Mock weather lookup. Deterministic by design; there is no upstream API.
pub fn weather_report(location: &str) -> String {
    format!("The weather in {location} is currently sunny and 22 degrees Celsius.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_report_shape() {
        let report = weather_report("Tokyo");
        assert!(report.contains("Tokyo"));
        assert!(report.contains("sunny"));
        assert!(report.contains("22 degrees Celsius"));
    }

    #[test]
    fn test_weather_report_deterministic() {
        assert_eq!(weather_report("Paris"), weather_report("Paris"));
    }

    #[test]
    fn test_builtin_registry_has_only_get_weather() {
        let registry = ToolRegistry::builtin();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["get_weather"]);
        assert!(registry.get("get_weather").is_some());
    }

    #[test]
    fn test_definitions_carry_schema() {
        let registry = ToolRegistry::builtin();
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "get_weather");
        assert_eq!(defs[0].parameters["required"][0], "location");
    }

    #[tokio::test]
    async fn test_dispatch_get_weather() {
        let registry = ToolRegistry::builtin();
        let result = registry
            .dispatch("get_weather", json!({"location": "Berlin"}))
            .await
            .unwrap();
        assert_eq!(
            result,
            "The weather in Berlin is currently sunny and 22 degrees Celsius."
        );
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let registry = ToolRegistry::builtin();
        let err = registry.dispatch("get_stock_price", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
        assert!(err.to_string().contains("get_stock_price"));
    }

    #[tokio::test]
    async fn test_dispatch_missing_location() {
        let registry = ToolRegistry::builtin();
        let err = registry.dispatch("get_weather", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
