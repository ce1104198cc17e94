//! LLM Provider Abstraction
//!
//! Responsibilities:
//! - Unified Provider trait for chat-completion backends
//! - Common message and tool-call types
//! - Request/Response handling
//! - Token estimation

pub mod openai;
pub mod token_counter;

pub use openai::{GEMINI_OPENAI_BASE_URL, OpenAiProvider, create_gemini_config, create_openai_config};
pub use token_counter::SimpleTokenCounter;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider-specific errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Context length exceeded: {length} > {max_length}")]
    ContextLengthExceeded { length: usize, max_length: usize },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Network error: {source}")]
    Network { source: reqwest::Error },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "tool")]
    Tool,
}

/// A single message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, deserialize_with = "deserialize_message_content")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::Assistant, content)
    }

    /// Result of a tool call, linked back to the call by id
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(MessageRole::Tool, content)
        }
    }
}

fn deserialize_message_content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let content = Option::<String>::deserialize(deserializer)?;
    Ok(content.unwrap_or_default())
}

/// Tool call request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: ToolCallFunction,
}

fn default_call_type() -> String {
    "function".to_string()
}

/// Tool call function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Complete request to LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tools: Option<Vec<serde_json::Value>>,
}

/// Response from LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

/// Choice in response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: usize,
    pub message: Message,
    pub finish_reason: Option<String>,
}

/// Token usage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub provider_type: ProviderType,
    pub api_key: String,
    pub base_url: Option<String>,
    pub default_model: String,
    pub timeout_ms: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!("{}***", &self.api_key[..4])
        } else {
            "***".to_string()
        };
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("provider_type", &self.provider_type)
            .field("api_key", &masked_key)
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl From<&str> for ProviderType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "openai" => ProviderType::OpenAi,
            _ => ProviderType::Gemini,
        }
    }
}

/// Token counter trait
pub trait TokenCounter: Send + Sync {
    fn count_messages(&self, messages: &[Message], model: &str) -> usize;
    fn count_text(&self, text: &str, model: &str) -> usize;
    fn get_max_tokens(&self, model: &str) -> usize;
}

/// LLM Provider trait
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// Get provider name
    fn name(&self) -> &str;

    /// Complete a request (non-streaming)
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Get token usage for a request
    fn estimate_tokens(&self, request: &CompletionRequest) -> Usage;

    /// Get configuration
    fn config(&self) -> &ProviderConfig;
}

/// Convert provider error from external error
pub fn map_provider_error(error: reqwest::Error) -> ProviderError {
    if let Some(status) = error.status() {
        match status.as_u16() {
            401 | 403 => ProviderError::Auth {
                message: "Invalid API key".to_string(),
            },
            429 => ProviderError::RateLimited { retry_after: 60 },
            code => ProviderError::Api {
                message: error.to_string(),
                status_code: Some(code),
            },
        }
    } else {
        ProviderError::Network { source: error }
    }
}
