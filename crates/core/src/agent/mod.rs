//! Tool-using agent
//!
//! Responsibilities:
//! - ReAct loop: the model reasons, picks tools, reads their results, answers
//! - Tool execution seam (`ToolExecutor`)
//! - Fixed system instruction for job-search conversations

mod helpers;
pub mod prompts;
mod runner;

pub use prompts::JOB_SEARCH_SYSTEM_PROMPT;
pub use runner::{ReactAgent, TOOL_LIMIT_REACHED};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback answer when the model produces no text
pub const EMPTY_RESPONSE: &str = "The agent returned an empty response.";

/// Agent errors
#[derive(Debug, Error, Clone)]
pub enum AgentError {
    #[error("LLM provider error: {0}")]
    LlmError(String),

    #[error("Tool execution error: {0}")]
    ToolError(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid config: {0}")]
    ConfigError(String),
}

/// Executes tool calls requested by the model
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run a tool with JSON-encoded arguments
    async fn execute_tool(&self, name: &str, arguments: &str) -> Result<String, AgentError>;

    /// Tool names available to the model
    fn list_tools(&self) -> Vec<String>;

    /// Tool declarations (OpenAI function calling format)
    fn tool_schemas(&self) -> Vec<serde_json::Value>;
}

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model identifier sent with every request
    pub model: String,

    /// Maximum tool calls per run
    pub max_tool_calls: usize,

    pub temperature: f32,

    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            max_tool_calls: 25,
            temperature: 0.1,
            max_tokens: 4096,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_tool_calls == 0 || self.max_tool_calls > 200 {
            return Err(AgentError::ConfigError(format!(
                "max_tool_calls must be 1..=200, got {}",
                self.max_tool_calls
            )));
        }
        if self.model.trim().is_empty() {
            return Err(AgentError::ConfigError("model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// A tool call made during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
    pub is_error: bool,
}

/// Result of a run
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// Final answer text
    pub content: String,

    /// Tool calls in execution order
    pub tool_calls: Vec<AgentToolCall>,

    /// Model round trips
    pub rounds: usize,

    /// False when the tool-call budget ran out
    pub is_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_validate() {
        assert!(AgentConfig::default().validate().is_ok());

        let zero = AgentConfig {
            max_tool_calls: 0,
            ..AgentConfig::default()
        };
        assert!(matches!(zero.validate(), Err(AgentError::ConfigError(_))));

        let no_model = AgentConfig {
            model: " ".to_string(),
            ..AgentConfig::default()
        };
        assert!(no_model.validate().is_err());
    }
}
