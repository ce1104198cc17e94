//! Assistant session - lazily built agent over one MCP connection
//!
//! The first request checks the credential, connects to the MCP server,
//! discovers and wraps its tools, and builds the agent. Everything is then
//! cached until `close()`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use jobassist_core::config::ENV_API_KEY;
use jobassist_core::llm::{OpenAiProvider, SimpleTokenCounter};
use jobassist_core::{
    AgentConfig, AgentError, AssistantConfig, JOB_SEARCH_SYSTEM_PROMPT, LlmProvider, Message,
    ProviderConfig, ProviderError, ReactAgent,
};
use jobassist_runtime::tools::RegistrySummary;
use jobassist_runtime::{
    McpError, McpTool, ToolDescriptor, ToolRegistry, ToolServer, ToolServerConnector,
};

use crate::history::ChatTurn;

pub const TOOLS_HEADING: &str = "### MCP Tools from Adzuna";
pub const NO_TOOLS_WARNING: &str = "Warning: No tools were returned by the Adzuna MCP server.";
pub const NO_TOOL_DESCRIPTION: &str = "No description available.";

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{} environment variable is not set.", ENV_API_KEY)]
    MissingCredential,

    #[error("Prompt cannot be empty.")]
    EmptyPrompt,

    #[error(transparent)]
    Mcp(#[from] McpError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Builds the LLM provider once the credential is known
pub type ProviderFactory =
    Arc<dyn Fn(ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> + Send + Sync>;

/// OpenAI-compatible provider (Gemini by default)
pub fn default_provider_factory() -> ProviderFactory {
    Arc::new(|config| {
        let provider = OpenAiProvider::new(config, Arc::new(SimpleTokenCounter::new()))?;
        Ok(Arc::new(provider) as Arc<dyn LlmProvider>)
    })
}

/// Initialized state shared by all requests
struct SessionRuntime {
    server: Arc<dyn ToolServer>,
    registry: Arc<ToolRegistry>,
    agent: ReactAgent,
    /// `(remote name, description)` as the server advertised them
    listing: Vec<(String, String)>,
}

fn tool_listing(descriptors: &[ToolDescriptor]) -> Vec<(String, String)> {
    descriptors
        .iter()
        .map(|d| {
            let description = d
                .description
                .as_deref()
                .filter(|text| !text.is_empty())
                .unwrap_or(NO_TOOL_DESCRIPTION);
            (d.name.clone(), description.to_string())
        })
        .collect()
}

pub struct AssistantSession {
    settings: AssistantConfig,
    connector: Arc<dyn ToolServerConnector>,
    provider_factory: ProviderFactory,
    runtime: RwLock<Option<Arc<SessionRuntime>>>,
    init_lock: Mutex<()>,
    initializations: AtomicUsize,
}

impl std::fmt::Debug for AssistantSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantSession")
            .field("settings", &self.settings)
            .field("initializations", &self.initialization_count())
            .finish_non_exhaustive()
    }
}

impl AssistantSession {
    pub fn new(
        settings: AssistantConfig,
        connector: Arc<dyn ToolServerConnector>,
        provider_factory: ProviderFactory,
    ) -> Self {
        Self {
            settings,
            connector,
            provider_factory,
            runtime: RwLock::new(None),
            init_lock: Mutex::new(()),
            initializations: AtomicUsize::new(0),
        }
    }

    pub fn settings(&self) -> &AssistantConfig {
        &self.settings
    }

    /// Number of completed initializations since creation
    pub fn initialization_count(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    pub async fn is_initialized(&self) -> bool {
        self.runtime.read().await.is_some()
    }

    async fn cached(&self) -> Option<Arc<SessionRuntime>> {
        self.runtime.read().await.clone()
    }

    async fn ensure_runtime(&self) -> Result<Arc<SessionRuntime>, SessionError> {
        if let Some(runtime) = self.cached().await {
            return Ok(runtime);
        }

        let _guard = self.init_lock.lock().await;
        if let Some(runtime) = self.cached().await {
            return Ok(runtime);
        }

        let provider_config = self
            .settings
            .llm
            .provider_config()
            .ok_or(SessionError::MissingCredential)?;
        let provider = (self.provider_factory)(provider_config)?;

        let server = self.connector.connect().await?;
        let descriptors = match server.list_tools().await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                if let Err(close_err) = server.close().await {
                    warn!(error = %close_err, "Failed to close MCP connection");
                }
                return Err(e.into());
            }
        };
        if descriptors.is_empty() {
            warn!("MCP server returned no tools");
        }

        let mut registry = ToolRegistry::new();
        registry.register_all(McpTool::from_descriptors(&descriptors, server.clone()));
        let registry = Arc::new(registry);

        let llm = &self.settings.llm;
        let agent = ReactAgent::new(
            provider,
            registry.clone(),
            AgentConfig {
                model: llm.model.clone(),
                max_tool_calls: self.settings.agent.max_tool_calls,
                temperature: llm.temperature,
                max_tokens: llm.max_tokens,
            },
        )?;

        info!(
            tools = ?registry.names(),
            model = %llm.model,
            "Assistant session initialized"
        );

        let runtime = Arc::new(SessionRuntime {
            server,
            registry,
            agent,
            listing: tool_listing(&descriptors),
        });
        *self.runtime.write().await = Some(runtime.clone());
        self.initializations.fetch_add(1, Ordering::SeqCst);
        Ok(runtime)
    }

    fn system_prompt(&self) -> &str {
        self.settings
            .agent
            .system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(JOB_SEARCH_SYSTEM_PROMPT)
    }

    /// System instruction, prior turns, then the new question
    fn build_messages(&self, prompt: &str, history: &[ChatTurn]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(Message::system(self.system_prompt()));
        for turn in history {
            if !turn.user.is_empty() {
                messages.push(Message::user(turn.user.clone()));
            }
            if !turn.assistant.is_empty() {
                messages.push(Message::assistant(turn.assistant.clone()));
            }
        }
        messages.push(Message::user(prompt));
        messages
    }

    /// Answer a question given the prior conversation
    pub async fn invoke(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, SessionError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SessionError::EmptyPrompt);
        }

        let runtime = self.ensure_runtime().await?;
        let response = runtime
            .agent
            .run(self.build_messages(prompt, history))
            .await?;

        info!(
            rounds = response.rounds,
            tool_calls = response.tool_calls.len(),
            complete = response.is_complete,
            "Agent finished"
        );
        Ok(response.content)
    }

    /// Markdown list of the available tools, or a warning line
    pub async fn describe_tools(&self) -> String {
        let runtime = match self.ensure_runtime().await {
            Ok(runtime) => runtime,
            Err(e) => return format!("Warning: Unable to load MCP tools: {}", e),
        };

        if runtime.listing.is_empty() {
            return NO_TOOLS_WARNING.to_string();
        }

        let mut lines = vec![TOOLS_HEADING.to_string()];
        lines.extend(
            runtime
                .listing
                .iter()
                .map(|(name, description)| format!("- **{}**: {}", name, description)),
        );
        lines.join("\n")
    }

    /// Tool call counters, once the session is initialized
    pub async fn tool_stats(&self) -> Option<RegistrySummary> {
        self.cached().await.map(|runtime| runtime.registry.summary())
    }

    /// Drop the connection and cached agent; the next call re-initializes
    pub async fn close(&self) {
        let _guard = self.init_lock.lock().await;
        let runtime = self.runtime.write().await.take();
        if let Some(runtime) = runtime {
            if let Err(e) = runtime.server.close().await {
                warn!(error = %e, "Failed to close MCP connection");
            }
            info!("Assistant session closed");
        }
    }
}
