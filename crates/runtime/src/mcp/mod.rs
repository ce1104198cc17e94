//! MCP (Model Context Protocol) Integration
//!
//! Responsibilities:
//! - Connect to a remote MCP server over streamable HTTP
//! - Tool discovery (`tools/list`) and invocation (`tools/call`)
//! - Session teardown

pub mod transport;

pub use transport::{HttpTransport, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpTransport};

use jobassist_core::config::McpSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Protocol revision sent in `initialize`
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Upper bound on `tools/list` pages
const MAX_TOOL_PAGES: usize = 100;

/// MCP errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("connection is closed")]
    Closed,

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Tool advertised by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

/// One content block of a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Fields of non-text blocks (data, mimeType, resource, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: Some(text.into()),
            extra: serde_json::Map::new(),
        }
    }
}

/// Result of `tools/call`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<serde_json::Value>,
}

impl CallToolResult {
    /// Text of the first content block, when it has any
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .first()
            .and_then(|item| item.text.as_deref())
            .filter(|text| !text.is_empty())
    }
}

impl std::fmt::Display for CallToolResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

/// Server identity reported by `initialize`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// A connected source of remote tools
#[async_trait::async_trait]
pub trait ToolServer: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError>;

    async fn close(&self) -> Result<(), McpError>;
}

/// Opens tool server connections
#[async_trait::async_trait]
pub trait ToolServerConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ToolServer>, McpError>;
}

/// Client connection settings
#[derive(Debug, Clone)]
pub struct McpClientConfig {
    pub url: String,
    pub timeout_ms: u64,
    pub headers: HashMap<String, String>,
    pub client_name: String,
    pub client_version: String,
}

impl McpClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: 30_000,
            headers: HashMap::new(),
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl From<&McpSettings> for McpClientConfig {
    fn from(settings: &McpSettings) -> Self {
        Self {
            timeout_ms: settings.timeout_ms,
            headers: settings.headers.clone(),
            ..Self::new(settings.server_url.clone())
        }
    }
}

/// MCP client over one session
pub struct McpClient {
    transport: Box<dyn McpTransport>,
    next_id: AtomicU64,
    closed: AtomicBool,
    server_info: ServerInfo,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("server_info", &self.server_info)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl McpClient {
    /// Connect over HTTP and complete the initialize handshake
    pub async fn connect(config: &McpClientConfig) -> Result<Self, McpError> {
        info!(url = %config.url, "Connecting to MCP server");
        let transport = HttpTransport::new(
            config.url.clone(),
            Duration::from_millis(config.timeout_ms),
            config.headers.clone(),
        )?;
        Self::initialize(Box::new(transport), config).await
    }

    /// Run the handshake over an existing transport
    pub async fn initialize(
        transport: Box<dyn McpTransport>,
        config: &McpClientConfig,
    ) -> Result<Self, McpError> {
        let mut client = Self {
            transport,
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            server_info: ServerInfo::default(),
        };

        let result = client
            .request(
                "initialize",
                Some(serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": config.client_name,
                        "version": config.client_version,
                    }
                })),
            )
            .await?;

        if let Some(info) = result.get("serverInfo") {
            client.server_info = serde_json::from_value(info.clone()).unwrap_or_default();
        }
        let negotiated = result
            .get("protocolVersion")
            .and_then(|v| v.as_str())
            .unwrap_or(PROTOCOL_VERSION);
        info!(
            server = %client.server_info.name,
            version = %client.server_info.version,
            protocol = negotiated,
            "MCP session initialized"
        );

        client
            .transport
            .notify(&JsonRpcRequest::notification("notifications/initialized"))
            .await?;

        Ok(client)
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let response = self
            .transport
            .request(&JsonRpcRequest::new(id, method, params))
            .await?;
        response.into_result()
    }

    /// All tools, following `nextCursor` pages
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor
                .as_ref()
                .map(|c| serde_json::json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;

            let page: Vec<ToolDescriptor> = match result.get("tools") {
                Some(list) => serde_json::from_value(list.clone())?,
                None => Vec::new(),
            };
            tools.extend(page);

            let next = result
                .get("nextCursor")
                .and_then(|v| v.as_str())
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            match next {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => {
                    debug!(count = tools.len(), "Discovered MCP tools");
                    return Ok(tools);
                }
            }
        }

        warn!(pages = MAX_TOOL_PAGES, "tools/list pagination did not terminate");
        Ok(tools)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = name, "Calling MCP tool");
        let result = self
            .request(
                "tools/call",
                Some(serde_json::json!({ "name": name, "arguments": arguments })),
            )
            .await?;
        let result: CallToolResult = serde_json::from_value(result)?;
        if result.is_error {
            warn!(tool = name, "MCP tool reported an error");
        }
        Ok(result)
    }

    /// End the session; later calls fail with `McpError::Closed`
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.transport.close().await;
        info!("MCP session closed");
    }
}

#[async_trait::async_trait]
impl ToolServer for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        McpClient::call_tool(self, name, arguments).await
    }

    async fn close(&self) -> Result<(), McpError> {
        McpClient::close(self).await;
        Ok(())
    }
}

/// Connects to an MCP server over streamable HTTP
#[derive(Debug, Clone)]
pub struct McpConnector {
    config: McpClientConfig,
}

impl McpConnector {
    pub fn new(config: McpClientConfig) -> Self {
        Self { config }
    }

    pub fn from_settings(settings: &McpSettings) -> Self {
        Self::new(McpClientConfig::from(settings))
    }
}

#[async_trait::async_trait]
impl ToolServerConnector for McpConnector {
    async fn connect(&self) -> Result<Arc<dyn ToolServer>, McpError> {
        let client = McpClient::connect(&self.config).await?;
        Ok(Arc::new(client))
    }
}
