//! Web chat server
//!
//! Routes:
//! - `GET /`          chat page
//! - `POST /api/chat` one question with prior history
//! - `GET /api/tools` markdown list of MCP tools
//! - `GET /healthz`   liveness and tool call counters

use anyhow::Context;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use uuid::Uuid;

use jobassist_runtime::tools::RegistrySummary;

use crate::history::normalize_history;
use crate::session::AssistantSession;

pub const PAGE_TITLE: &str = "Adzuna MCP Job Assistant";

/// Reply to a blank message
pub const EMPTY_MESSAGE_REPLY: &str = "Please enter a question about jobs.";

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Clone)]
struct AppState {
    session: Arc<AssistantSession>,
    started_at: DateTime<Utc>,
}

/// `message` is a string or a `{ "text": ... }` object
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: serde_json::Value,
    #[serde(default)]
    pub history: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub markdown: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub initialized: bool,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
    /// Tool call counters; absent until the first request initializes the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<RegistrySummary>,
}

pub fn router(session: Arc<AssistantSession>) -> Router {
    let state = AppState {
        session,
        started_at: Utc::now(),
    };
    Router::new()
        .route("/", get(index))
        .route("/api/chat", post(chat))
        .route("/api/tools", get(tools))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

fn message_text(message: &serde_json::Value) -> String {
    match message {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Object(map) => map
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Json<ChatResponse> {
    let request_id = Uuid::new_v4();
    let message = message_text(&request.message);
    if message.trim().is_empty() {
        return Json(ChatResponse {
            reply: EMPTY_MESSAGE_REPLY.to_string(),
        });
    }

    let history = normalize_history(&request.history);
    info!(%request_id, turns = history.len(), "Chat request");

    let reply = match state.session.invoke(&message, &history).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(%request_id, error = %e, "Chat request failed");
            format!("Warning: {}", e)
        }
    };
    Json(ChatResponse { reply })
}

async fn tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        markdown: state.session.describe_tools().await,
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        initialized: state.session.is_initialized().await,
        started_at: state.started_at,
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        tools: state.session.tool_stats().await,
    })
}

/// Serve until `shutdown` resolves, then close the session
pub async fn serve<F>(
    listener: TcpListener,
    session: Arc<AssistantSession>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    info!(%address, "Chat server listening on http://{}", address);

    let result = axum::serve(listener, router(session.clone()))
        .with_graceful_shutdown(shutdown)
        .await
        .context("chat server failed");

    session.close().await;
    info!("Chat server stopped");
    result
}

/// Bind `address` and serve until Ctrl-C
pub async fn run_server(session: Arc<AssistantSession>, address: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    serve(listener, session, shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
