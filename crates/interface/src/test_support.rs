//! Fakes for session and server tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobassist_core::llm::{
    Choice, CompletionRequest, CompletionResponse, ProviderType, Usage, create_gemini_config,
};
use jobassist_core::{AssistantConfig, LlmProvider, Message, ProviderConfig, ProviderError};
use jobassist_runtime::{
    CallToolResult, ContentItem, McpError, ToolDescriptor, ToolServer, ToolServerConnector,
};

use crate::session::ProviderFactory;

pub(crate) struct FakeServer {
    pub tools: Vec<ToolDescriptor>,
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
    pub closed: AtomicUsize,
}

#[async_trait::async_trait]
impl ToolServer for FakeServer {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        Ok(CallToolResult {
            content: vec![ContentItem::text("Found 2 data analyst jobs")],
            ..Default::default()
        })
    }

    async fn close(&self) -> Result<(), McpError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) struct FakeConnector {
    pub server: Arc<FakeServer>,
    pub connects: AtomicUsize,
    pub fail: bool,
}

impl FakeConnector {
    pub fn new(tools: Vec<ToolDescriptor>) -> Arc<Self> {
        Arc::new(Self::build(tools, false))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), true))
    }

    fn build(tools: Vec<ToolDescriptor>, fail: bool) -> Self {
        Self {
            server: Arc::new(FakeServer {
                tools,
                calls: Mutex::new(Vec::new()),
                closed: AtomicUsize::new(0),
            }),
            connects: AtomicUsize::new(0),
            fail,
        }
    }
}

#[async_trait::async_trait]
impl ToolServerConnector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn ToolServer>, McpError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        // Widen the window for racing initializers.
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            return Err(McpError::Transport("connection refused".to_string()));
        }
        Ok(self.server.clone())
    }
}

/// Replies from a script, then with a fixed answer
pub(crate) struct FakeProvider {
    config: ProviderConfig,
    script: Mutex<VecDeque<Message>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

#[async_trait::async_trait]
impl LlmProvider for FakeProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Gemini
    }

    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let message = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Message::assistant("Here are the jobs."));
        Ok(CompletionResponse {
            id: "r".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: request.model.clone(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: None,
            }],
            usage: None,
        })
    }

    fn estimate_tokens(&self, _request: &CompletionRequest) -> Usage {
        Usage::default()
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Factory handing out one shared fake provider, plus a build counter
pub(crate) fn fake_factory(
    script: Vec<Message>,
) -> (ProviderFactory, Arc<FakeProvider>, Arc<AtomicUsize>) {
    let provider = Arc::new(FakeProvider {
        config: create_gemini_config("test-key", "gemini-2.5-flash"),
        script: Mutex::new(script.into()),
        requests: Mutex::new(Vec::new()),
    });
    let built = Arc::new(AtomicUsize::new(0));
    let factory_provider = provider.clone();
    let factory_built = built.clone();
    let factory: ProviderFactory = Arc::new(move |_config| {
        factory_built.fetch_add(1, Ordering::SeqCst);
        Ok(factory_provider.clone() as Arc<dyn LlmProvider>)
    });
    (factory, provider, built)
}

pub(crate) fn settings_with_key() -> AssistantConfig {
    let mut settings = AssistantConfig::default();
    settings.llm.api_key = Some("test-key".to_string());
    settings
}

pub(crate) fn search_jobs() -> ToolDescriptor {
    ToolDescriptor {
        name: "search-jobs".to_string(),
        description: Some("Search Adzuna job ads".to_string()),
        input_schema: Some(serde_json::json!({
            "type": "object",
            "properties": {"what": {"type": "string"}, "where": {"type": "string"}},
            "required": ["what"]
        })),
    }
}
