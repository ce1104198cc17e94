//! Tool Trait - interface shared by every callable tool
//!
//! - Parameters and results are JSON
//! - One error type for all tools

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schema::ValidationError;
use crate::mcp::McpError;

/// Tool execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub metadata: ToolMetadata,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            metadata: ToolMetadata::default(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        let output = output.into();
        Self {
            success: false,
            error: Some(output.clone()),
            output,
            metadata: ToolMetadata::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub execution_time_ms: u64,
    pub bytes_processed: u64,
}

/// Tool errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArgument(#[from] ValidationError),

    #[error("remote tool call failed: {0}")]
    Remote(#[from] McpError),
}

/// Tool parameters (JSON)
pub type ToolParams = serde_json::Value;

/// Tool Trait - implemented by every tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model calls the tool by
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn execute(&self, params: &ToolParams) -> Result<ToolResult, ToolError>;

    /// Parameter schema declared to the model
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }
}
