//! ReAct loop runner: model round, tool execution, repeat until a plain answer.

use super::helpers::{
    MAX_CONVERSATION_MESSAGES, sanitize_tool_output, summarize_tool_calls, truncate_for_log,
    truncate_messages,
};
use super::{AgentConfig, AgentError, AgentResponse, AgentToolCall, EMPTY_RESPONSE, ToolExecutor};
use crate::llm::provider::{CompletionRequest, LlmProvider, Message, ToolCall};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tool result for calls refused because the budget ran out
pub const TOOL_LIMIT_REACHED: &str = "Error: Tool call limit reached; this call was not executed.";

/// Reasoning-and-acting agent over an LLM provider and a tool executor
pub struct ReactAgent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolExecutor>,
    config: AgentConfig,
}

impl std::fmt::Debug for ReactAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactAgent")
            .field("provider", &self.provider.name())
            .field("tools", &self.tools.list_tools())
            .field("config", &self.config)
            .finish()
    }
}

impl ReactAgent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolExecutor>,
        config: AgentConfig,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self {
            provider,
            tools,
            config,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.list_tools()
    }

    /// Run the loop over a prepared conversation (system, history, new user turn).
    pub async fn run(&self, mut messages: Vec<Message>) -> Result<AgentResponse, AgentError> {
        let tool_schemas = self.tools.tool_schemas();
        let mut all_tool_calls: Vec<AgentToolCall> = Vec::new();
        let mut round = 0usize;

        loop {
            round += 1;

            if all_tool_calls.len() >= self.config.max_tool_calls {
                warn!(
                    max_tool_calls = self.config.max_tool_calls,
                    "Max tool calls exceeded"
                );
                return Ok(AgentResponse {
                    content: format!(
                        "I've reached the maximum number of tool calls ({}). Please narrow the question and try again.",
                        self.config.max_tool_calls
                    ),
                    tool_calls: all_tool_calls,
                    rounds: round - 1,
                    is_complete: false,
                });
            }

            truncate_messages(&mut messages, MAX_CONVERSATION_MESSAGES);

            let request = CompletionRequest {
                model: self.config.model.clone(),
                messages: messages.clone(),
                temperature: Some(self.config.temperature),
                max_tokens: Some(self.config.max_tokens),
                tools: if tool_schemas.is_empty() {
                    None
                } else {
                    Some(tool_schemas.clone())
                },
            };

            let started = Instant::now();
            let response = self
                .provider
                .complete(&request)
                .await
                .map_err(|e| AgentError::LlmError(e.to_string()))?;
            let usage = response
                .usage
                .clone()
                .unwrap_or_else(|| self.provider.estimate_tokens(&request));
            debug!(
                round,
                duration_ms = started.elapsed().as_millis() as u64,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                estimated = response.usage.is_none(),
                "llm round finished"
            );

            let assistant_message = response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| AgentError::LlmError("No response from LLM".to_string()))?
                .message;

            match assistant_message.tool_calls.clone() {
                Some(tool_calls) if !tool_calls.is_empty() => {
                    info!(round, calls = %summarize_tool_calls(&tool_calls), "model requested tools");
                    messages.push(assistant_message);
                    let remaining = self.config.max_tool_calls.saturating_sub(all_tool_calls.len());
                    let (executed, skipped) = self.execute_tool_calls(&tool_calls, remaining).await;
                    for (call, record) in executed {
                        messages.push(call);
                        all_tool_calls.push(record);
                    }
                    messages.extend(skipped);
                }
                _ => {
                    let content = assistant_message.content.trim();
                    let content = if content.is_empty() {
                        EMPTY_RESPONSE.to_string()
                    } else {
                        content.to_string()
                    };
                    info!(
                        rounds = round,
                        tool_calls = all_tool_calls.len(),
                        "agent finished"
                    );
                    return Ok(AgentResponse {
                        content,
                        tool_calls: all_tool_calls,
                        rounds: round,
                        is_complete: true,
                    });
                }
            }
        }
    }

    /// Execute up to `budget` calls in order; failures are reported back to the
    /// model as text. Calls past the budget are answered without running.
    async fn execute_tool_calls(
        &self,
        tool_calls: &[ToolCall],
        budget: usize,
    ) -> (Vec<(Message, AgentToolCall)>, Vec<Message>) {
        let split = budget.min(tool_calls.len());
        let (allowed, over_budget) = tool_calls.split_at(split);
        let mut results = Vec::with_capacity(allowed.len());

        if !over_budget.is_empty() {
            warn!(
                skipped = over_budget.len(),
                max_tool_calls = self.config.max_tool_calls,
                "Tool call budget exhausted mid-round"
            );
        }
        let skipped = over_budget
            .iter()
            .map(|call| Message::tool(call.id.clone(), TOOL_LIMIT_REACHED))
            .collect();

        for tool_call in allowed {
            let function = &tool_call.function;
            let started = Instant::now();

            let (content, is_error) = match self
                .tools
                .execute_tool(&function.name, &function.arguments)
                .await
            {
                Ok(content) => (content, false),
                Err(e) => {
                    warn!(tool = %function.name, error = %e, "tool call failed");
                    (format!("Error: {}", e), true)
                }
            };

            debug!(
                tool = %function.name,
                duration_ms = started.elapsed().as_millis() as u64,
                is_error,
                preview = %truncate_for_log(&content, 120),
                "tool call finished"
            );

            results.push((
                Message::tool(tool_call.id.clone(), sanitize_tool_output(&content)),
                AgentToolCall {
                    id: tool_call.id.clone(),
                    name: function.name.clone(),
                    arguments: function.arguments.clone(),
                    is_error,
                },
            ));
        }

        (results, skipped)
    }
}
