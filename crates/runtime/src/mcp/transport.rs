//! MCP Transport Layer - JSON-RPC over streamable HTTP
//!
//! - HTTP POST for every JSON-RPC message
//! - Response is either a single JSON body or an SSE stream
//! - Session tracked through the `Mcp-Session-Id` header

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::McpError;

const SESSION_HEADER: &str = "mcp-session-id";

/// JSON-RPC request or notification (no id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.into(),
            params: None,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn answers(&self, id: u64) -> bool {
        match &self.id {
            Some(serde_json::Value::Number(n)) => n.as_u64() == Some(id),
            Some(serde_json::Value::String(s)) => s.parse::<u64>().ok() == Some(id),
            _ => false,
        }
    }

    /// Unwrap into the result payload, turning JSON-RPC errors into `McpError::Rpc`
    pub fn into_result(self) -> Result<serde_json::Value, McpError> {
        if let Some(error) = self.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(serde_json::Value::Null))
    }
}

/// JSON-RPC error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Transport trait for MCP communication
#[async_trait::async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for its response
    async fn request(&self, message: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError>;

    /// Send a notification; no response is expected
    async fn notify(&self, message: &JsonRpcRequest) -> Result<(), McpError>;

    /// End the session
    async fn close(&self);
}

/// A parsed SSE event
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SseEvent {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
}

/// Parse a `text/event-stream` body into events; events without data are dropped.
pub(crate) fn parse_sse_events(body: &str) -> Vec<SseEvent> {
    let normalized = body.replace("\r\n", "\n");
    let mut events = Vec::new();

    for raw_event in normalized.split("\n\n") {
        let mut event = SseEvent::default();
        let mut has_data = false;

        for line in raw_event.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "id" => event.id = Some(value.to_string()),
                "event" => event.event = Some(value.to_string()),
                "data" => {
                    if has_data {
                        event.data.push('\n');
                    }
                    event.data.push_str(value);
                    has_data = true;
                }
                _ => {}
            }
        }

        if has_data {
            events.push(event);
        }
    }

    events
}

/// HTTP transport for remote MCP servers
#[derive(Debug)]
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    headers: HashMap<String, String>,
    session_id: RwLock<Option<String>>,
    closed: AtomicBool,
}

impl HttpTransport {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        headers: HashMap<String, String>,
    ) -> Result<Self, McpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
            headers,
            session_id: RwLock::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Session id assigned by the server, if any
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().ok().and_then(|guard| guard.clone())
    }

    fn ensure_open(&self) -> Result<(), McpError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(McpError::Closed)
        } else {
            Ok(())
        }
    }

    fn build_request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, &self.url)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream");

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(session_id) = self.session_id() {
            request = request.header(SESSION_HEADER, session_id);
        }
        request
    }

    async fn post(&self, message: &JsonRpcRequest) -> Result<reqwest::Response, McpError> {
        self.ensure_open()?;

        tracing::debug!(url = %self.url, method = %message.method, id = ?message.id, "sending MCP message");

        let response = self
            .build_request(reqwest::Method::POST)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    McpError::Timeout(e.to_string())
                } else {
                    McpError::Transport(format!("request failed: {}", e))
                }
            })?;

        if let Some(value) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut guard) = self.session_id.write() {
                if guard.as_deref() != Some(value) {
                    tracing::debug!(session_id = value, "captured MCP session id");
                    *guard = Some(value.to_string());
                }
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }

        Ok(response)
    }
}

/// 4xx: request rejected, 5xx: server failure
fn classify_http_error(status: reqwest::StatusCode, body: &str) -> McpError {
    let detail = body.trim();
    let message = if status.is_client_error() {
        format!("request rejected by MCP server ({})", status)
    } else if status.is_server_error() {
        format!("MCP server error ({})", status)
    } else {
        format!("unexpected HTTP status {}", status)
    };
    McpError::Http {
        status: status.as_u16(),
        message: if detail.is_empty() {
            message
        } else {
            format!("{}: {}", message, detail)
        },
    }
}

#[async_trait::async_trait]
impl McpTransport for HttpTransport {
    async fn request(&self, message: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let id = message
            .id
            .ok_or_else(|| McpError::Protocol("request without id".to_string()))?;
        let response = self.post(message).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| McpError::Transport(format!("failed to read response body: {}", e)))?;

        if content_type.contains("text/event-stream") {
            for event in parse_sse_events(&body) {
                if event.event.as_deref().is_some_and(|e| e != "message") {
                    continue;
                }
                match serde_json::from_str::<JsonRpcResponse>(&event.data) {
                    Ok(parsed) if parsed.answers(id) => return Ok(parsed),
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping undecodable SSE event");
                    }
                }
            }
            return Err(McpError::Protocol(format!(
                "no response for request {} in event stream",
                id
            )));
        }

        if body.trim().is_empty() {
            return Err(McpError::Protocol(format!(
                "empty response body for request {}",
                id
            )));
        }

        let parsed: JsonRpcResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }

    async fn notify(&self, message: &JsonRpcRequest) -> Result<(), McpError> {
        // Servers answer notifications with 202 and no body.
        self.post(message).await.map(|_| ())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.session_id().is_none() {
            return;
        }
        match self.build_request(reqwest::Method::DELETE).send().await {
            Ok(response) => {
                tracing::debug!(status = %response.status(), "MCP session terminated");
            }
            Err(e) => {
                tracing::debug!(error = %e, "MCP session termination failed");
            }
        }
        if let Ok(mut guard) = self.session_id.write() {
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::Response;
    use axum::routing::post;
    use std::sync::Arc;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    async fn start_test_server(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/mcp")
    }

    fn transport(url: &str) -> HttpTransport {
        HttpTransport::new(url, Duration::from_secs(5), HashMap::new()).unwrap()
    }

    fn respond(content_type: &'static str, body: String) -> Response {
        Response::builder()
            .status(200)
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap()
    }

    // ---- SSE parsing ----

    #[test]
    fn test_parse_multiple_sse_events() {
        let raw = "id: evt-1\nevent: message\ndata: {\"a\":1}\n\nid: evt-2\ndata: {\"b\":2}\n\n";
        let events = parse_sse_events(raw);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id.as_deref(), Some("evt-1"));
        assert_eq!(events[0].event.as_deref(), Some("message"));
        assert_eq!(events[1].data, "{\"b\":2}");
    }

    #[test]
    fn test_parse_sse_multiline_data_and_crlf() {
        let events = parse_sse_events("data: line1\r\ndata: line2\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn test_parse_sse_skips_comments_and_dataless_events() {
        let events = parse_sse_events(": keepalive\n\nevent: ping\n\n");
        assert!(events.is_empty());
    }

    // ---- HTTP round trips ----

    #[tokio::test]
    async fn test_request_json_response() {
        let app = Router::new().route(
            "/mcp",
            post(|| async {
                respond(
                    "application/json",
                    r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#.to_string(),
                )
            }),
        );
        let url = start_test_server(app).await;

        let response = transport(&url)
            .request(&JsonRpcRequest::new(1, "tools/list", None))
            .await
            .unwrap();
        assert_eq!(response.into_result().unwrap(), serde_json::json!({"tools": []}));
    }

    #[tokio::test]
    async fn test_request_sse_response_picks_matching_id() {
        let app = Router::new().route(
            "/mcp",
            post(|| async {
                respond(
                    "text/event-stream",
                    concat!(
                        "event: message\n",
                        "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n",
                        "event: message\n",
                        "data: {\"jsonrpc\":\"2.0\",\"id\":7,\"result\":{\"ok\":true}}\n\n"
                    )
                    .to_string(),
                )
            }),
        );
        let url = start_test_server(app).await;

        let response = transport(&url)
            .request(&JsonRpcRequest::new(7, "tools/call", None))
            .await
            .unwrap();
        assert_eq!(response.into_result().unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn test_session_id_is_captured_and_echoed() {
        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let app = Router::new().route(
            "/mcp",
            post(move |headers: HeaderMap| {
                let seen = seen_clone.clone();
                async move {
                    seen.lock().unwrap().push(
                        headers
                            .get("mcp-session-id")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                    );
                    Response::builder()
                        .status(200)
                        .header("content-type", "application/json")
                        .header("mcp-session-id", "session-abc")
                        .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#))
                        .unwrap()
                }
            }),
        );
        let url = start_test_server(app).await;
        let transport = transport(&url);

        transport.request(&JsonRpcRequest::new(1, "initialize", None)).await.unwrap();
        transport.request(&JsonRpcRequest::new(1, "tools/list", None)).await.unwrap();

        assert_eq!(transport.session_id().as_deref(), Some("session-abc"));
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], None);
        assert_eq!(seen[1].as_deref(), Some("session-abc"));
    }

    #[tokio::test]
    async fn test_http_errors_are_classified() {
        let app = Router::new().route(
            "/mcp",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "warming up") }),
        );
        let url = start_test_server(app).await;

        let err = transport(&url)
            .request(&JsonRpcRequest::new(1, "tools/list", None))
            .await
            .unwrap_err();
        match err {
            McpError::Http { status, message } => {
                assert_eq!(status, 503);
                assert!(message.contains("warming up"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_notification_accepts_empty_202() {
        let app = Router::new().route("/mcp", post(|| async { StatusCode::ACCEPTED }));
        let url = start_test_server(app).await;

        transport(&url)
            .notify(&JsonRpcRequest::notification("notifications/initialized"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_requests() {
        let transport = transport("http://127.0.0.1:9/mcp");
        transport.close().await;
        let err = transport
            .request(&JsonRpcRequest::new(1, "tools/list", None))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Closed));
    }

    #[test]
    fn test_rpc_error_into_result() {
        let response: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, McpError::Rpc { code: -32601, .. }));
    }
}
