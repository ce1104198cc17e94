//! jobassist core
//!
//! Contains:
//! - config: YAML + environment configuration
//! - llm: provider abstraction and the OpenAI-compatible (Gemini) provider
//! - agent: the ReAct tool-calling loop

pub mod agent;
pub mod config;
pub mod llm;

pub use agent::{
    AgentConfig, AgentError, AgentResponse, AgentToolCall, EMPTY_RESPONSE,
    JOB_SEARCH_SYSTEM_PROMPT, ReactAgent, ToolExecutor,
};
pub use config::{AssistantConfig, ConfigError, ConfigLoader};
pub use llm::provider::{LlmProvider, Message, MessageRole, ProviderConfig, ProviderError};
