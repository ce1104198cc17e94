//! MCP tool wrapper - exposes a remote MCP tool as a local `Tool`

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::schema::{InputModel, model_name_for_tool};
use super::trait_mod::{Tool, ToolError, ToolParams, ToolResult};
use crate::mcp::{ToolDescriptor, ToolServer};

/// Description used when the server sends none
pub const DEFAULT_TOOL_DESCRIPTION: &str = "No description provided.";

/// A remote MCP tool callable by the agent
pub struct McpTool {
    /// Agent-facing name (`-` replaced by `_`)
    name: String,
    /// Name the server knows the tool by
    remote_name: String,
    description: String,
    input_model: Option<InputModel>,
    server: Arc<dyn ToolServer>,
}

impl std::fmt::Debug for McpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpTool")
            .field("name", &self.name)
            .field("remote_name", &self.remote_name)
            .field("input_model", &self.input_model.as_ref().map(|m| &m.name))
            .finish()
    }
}

impl McpTool {
    pub fn from_descriptor(descriptor: &ToolDescriptor, server: Arc<dyn ToolServer>) -> Self {
        let description = descriptor
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_TOOL_DESCRIPTION)
            .to_string();
        let input_model = descriptor.input_schema.as_ref().and_then(|schema| {
            InputModel::from_json_schema(schema, &model_name_for_tool(&descriptor.name))
        });

        Self {
            name: descriptor.name.replace('-', "_"),
            remote_name: descriptor.name.clone(),
            description,
            input_model,
            server,
        }
    }

    /// Wrap every descriptor against one server
    pub fn from_descriptors(
        descriptors: &[ToolDescriptor],
        server: Arc<dyn ToolServer>,
    ) -> Vec<Arc<dyn Tool>> {
        descriptors
            .iter()
            .map(|d| Arc::new(Self::from_descriptor(d, server.clone())) as Arc<dyn Tool>)
            .collect()
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn input_model(&self) -> Option<&InputModel> {
        self.input_model.as_ref()
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, params: &ToolParams) -> Result<ToolResult, ToolError> {
        let arguments = match &self.input_model {
            Some(model) => serde_json::Value::Object(model.validate(params)?),
            None => match params {
                serde_json::Value::Null => serde_json::json!({}),
                other => other.clone(),
            },
        };

        debug!(tool = %self.remote_name, arguments = %arguments, "Forwarding tool call");
        let result = self.server.call_tool(&self.remote_name, arguments).await?;

        let output = match result.first_text() {
            Some(text) => text.to_string(),
            None => result.to_string(),
        };
        let bytes = output.len() as u64;

        let mut tool_result = if result.is_error {
            ToolResult::failed(output)
        } else {
            ToolResult::ok(output)
        };
        tool_result.metadata.bytes_processed = bytes;
        Ok(tool_result)
    }

    fn schema(&self) -> serde_json::Value {
        match &self.input_model {
            Some(model) => model.to_json_schema(),
            None => serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }
}
