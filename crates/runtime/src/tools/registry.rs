//! Tool Registry
//!
//! - Tools keyed by the name the model uses, in registration order
//! - Declares tools in OpenAI function format
//! - Per-tool call statistics
//! - Acts as the agent's `ToolExecutor`

use jobassist_core::agent::{AgentError, ToolExecutor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::trait_mod::{Tool, ToolError, ToolParams, ToolResult};

/// Tool registry
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,

    /// Registration order
    order: Vec<String>,

    stats: HashMap<String, ToolStats>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tool_names", &self.order)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a tool with the same name is replaced
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> String {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name.clone());
        }
        self.stats.insert(name.clone(), ToolStats::default());

        debug!(tool = %name, "Tool registered");
        name
    }

    pub fn register_all(&mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Tools in registration order
    pub fn all(&self) -> Vec<&Arc<dyn Tool>> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute(&self, name: &str, params: &ToolParams) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let start = std::time::Instant::now();
        let result = tool.execute(params).await;
        let duration = start.elapsed().as_millis() as u64;

        if let Some(stats) = self.stats.get(name) {
            stats.calls.fetch_add(1, Ordering::Relaxed);
            if !matches!(&result, Ok(r) if r.success) {
                stats.failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        debug!(
            tool = name,
            duration_ms = duration,
            success = matches!(&result, Ok(r) if r.success)
        );

        result.map(|mut r| {
            r.metadata.execution_time_ms = duration;
            r
        })
    }

    /// Tool declarations in OpenAI function calling format
    pub fn openai_functions(&self) -> Vec<serde_json::Value> {
        self.all()
            .into_iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.schema(),
                    }
                })
            })
            .collect()
    }

    pub fn summary(&self) -> RegistrySummary {
        let total_calls: u64 = self
            .stats
            .values()
            .map(|s| s.calls.load(Ordering::Relaxed))
            .sum();
        let total_failures: u64 = self
            .stats
            .values()
            .map(|s| s.failures.load(Ordering::Relaxed))
            .sum();

        RegistrySummary {
            total_tools: self.tools.len(),
            total_calls,
            total_failures,
            success_rate: if total_calls > 0 {
                (total_calls - total_failures) as f64 / total_calls as f64
            } else {
                0.0
            },
        }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute_tool(&self, name: &str, arguments: &str) -> Result<String, AgentError> {
        if !self.contains(name) {
            return Err(AgentError::UnknownTool(name.to_string()));
        }

        let params: ToolParams = if arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(arguments).map_err(|e| {
                AgentError::ToolError(format!("arguments for '{}' are not valid JSON: {}", name, e))
            })?
        };

        let result = self
            .execute(name, &params)
            .await
            .map_err(|e| AgentError::ToolError(e.to_string()))?;

        if result.success {
            Ok(result.output)
        } else {
            Err(AgentError::ToolError(
                result.error.unwrap_or(result.output),
            ))
        }
    }

    fn list_tools(&self) -> Vec<String> {
        self.names()
    }

    fn tool_schemas(&self) -> Vec<serde_json::Value> {
        self.openai_functions()
    }
}

#[derive(Debug, Default)]
struct ToolStats {
    calls: AtomicU64,
    failures: AtomicU64,
}

/// Registry statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub total_tools: usize,
    pub total_calls: u64,
    pub total_failures: u64,
    pub success_rate: f64,
}
