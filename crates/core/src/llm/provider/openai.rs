//! OpenAI-compatible Provider Implementation
//!
//! Supports:
//! - Google Gemini through its OpenAI-compatible endpoint
//! - OpenAI API (Chat Completions)
//! - Function tools and tool-call round trips

use super::*;
use reqwest::{Client, StatusCode};
use std::sync::Arc;

/// Gemini's OpenAI-compatible base URL
pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible Provider
#[derive(Clone)]
pub struct OpenAiProvider {
    config: ProviderConfig,
    client: Client,
    token_counter: Arc<dyn TokenCounter>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.config.name)
            .field("default_model", &self.config.default_model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Create a new provider
    pub fn new(
        config: ProviderConfig,
        token_counter: Arc<dyn TokenCounter>,
    ) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfig {
                message: format!("provider '{}' has no API key", config.name),
            });
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ProviderError::InvalidConfig {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            client,
            token_counter,
        })
    }

    /// Get base URL for API calls
    fn get_base_url(&self) -> &str {
        match (&self.config.base_url, self.config.provider_type) {
            (Some(url), _) => url.trim_end_matches('/'),
            (None, ProviderType::Gemini) => GEMINI_OPENAI_BASE_URL,
            (None, ProviderType::OpenAi) => OPENAI_BASE_URL,
        }
    }

    /// Build authorization header
    fn get_auth_header(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }

    fn build_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature.unwrap_or(0.1),
            "stream": false,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
            body["tools"] = serde_json::json!(tools);
            body["tool_choice"] = serde_json::json!("auto");
        }
        body
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_type(&self) -> ProviderType {
        self.config.provider_type
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.get_base_url());

        // Check context length
        let max_length = self.token_counter.get_max_tokens(&request.model);
        let estimated = self.estimate_tokens(request);
        if estimated.total_tokens as usize > max_length {
            return Err(ProviderError::ContextLengthExceeded {
                length: estimated.total_tokens as usize,
                max_length,
            });
        }

        tracing::debug!(
            provider = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.get_auth_header())
            .header("Content-Type", "application/json")
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(map_provider_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth {
                message: "Invalid API key".to_string(),
            });
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited { retry_after: 60 });
        } else if status == StatusCode::BAD_REQUEST {
            let error: serde_json::Value = response
                .json()
                .await
                .unwrap_or_else(|_| serde_json::json!({}));
            // Gemini wraps errors in a one-element array.
            let message = error["error"]["message"]
                .as_str()
                .or_else(|| error[0]["error"]["message"].as_str())
                .unwrap_or("Invalid request")
                .to_string();
            return Err(ProviderError::InvalidRequest { message });
        } else if !status.is_success() {
            return Err(ProviderError::Api {
                message: format!("API returned status {}", status),
                status_code: Some(status.as_u16()),
            });
        }

        let response: CompletionResponse = response.json().await.map_err(|e| ProviderError::Api {
            message: format!("Failed to parse response: {}", e),
            status_code: None,
        })?;

        Ok(response)
    }

    fn estimate_tokens(&self, request: &CompletionRequest) -> Usage {
        let prompt_tokens = self
            .token_counter
            .count_messages(&request.messages, &request.model);
        let completion_tokens = request.max_tokens.unwrap_or(1024) as usize;
        Usage {
            prompt_tokens: prompt_tokens as u32,
            completion_tokens: completion_tokens as u32,
            total_tokens: (prompt_tokens + completion_tokens) as u32,
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Create a Gemini configuration (OpenAI-compatible endpoint)
pub fn create_gemini_config(api_key: &str, default_model: &str) -> ProviderConfig {
    ProviderConfig {
        name: "gemini".to_string(),
        provider_type: ProviderType::Gemini,
        api_key: api_key.to_string(),
        base_url: None,
        default_model: default_model.to_string(),
        timeout_ms: 60000,
    }
}

/// Create a basic OpenAI configuration
pub fn create_openai_config(name: &str, api_key: &str, default_model: &str) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        provider_type: ProviderType::OpenAi,
        api_key: api_key.to_string(),
        base_url: None,
        default_model: default_model.to_string(),
        timeout_ms: 60000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    async fn start_test_server(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn provider_for(base_url: &str) -> OpenAiProvider {
        let mut config = create_gemini_config("test-key", "gemini-2.5-flash");
        config.base_url = Some(base_url.to_string());
        OpenAiProvider::new(config, Arc::new(SimpleTokenCounter::new())).unwrap()
    }

    fn request_with_tools() -> CompletionRequest {
        CompletionRequest {
            model: "gemini-2.5-flash".to_string(),
            messages: vec![Message::system("be brief"), Message::user("jobs in Singapore?")],
            temperature: None,
            max_tokens: Some(256),
            tools: Some(vec![serde_json::json!({
                "type": "function",
                "function": {"name": "search_jobs", "parameters": {"type": "object"}}
            })]),
        }
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let config = create_gemini_config("  ", "gemini-2.5-flash");
        let err = OpenAiProvider::new(config, Arc::new(SimpleTokenCounter::new())).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig { .. }));
    }

    #[test]
    fn test_default_base_urls() {
        let gemini = OpenAiProvider::new(
            create_gemini_config("k", "gemini-2.5-flash"),
            Arc::new(SimpleTokenCounter::new()),
        )
        .unwrap();
        assert_eq!(gemini.get_base_url(), GEMINI_OPENAI_BASE_URL);

        let openai = OpenAiProvider::new(
            create_openai_config("openai", "k", "gpt-4o"),
            Arc::new(SimpleTokenCounter::new()),
        )
        .unwrap();
        assert_eq!(openai.get_base_url(), OPENAI_BASE_URL);
    }

    #[test]
    fn test_body_includes_tools_only_when_present() {
        let provider = provider_for("http://localhost");
        let mut request = request_with_tools();
        let body = provider.build_body(&request);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["function"]["name"], "search_jobs");

        request.tools = Some(vec![]);
        let body = provider.build_body(&request);
        assert!(body.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_complete_parses_tool_calls() {
        let seen: Arc<Mutex<Option<(String, serde_json::Value)>>> = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let seen = seen_clone.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *seen.lock().unwrap() = Some((auth, body));
                    Json(serde_json::json!({
                        "id": "resp-1",
                        "object": "chat.completion",
                        "created": 1,
                        "model": "gemini-2.5-flash",
                        "choices": [{
                            "index": 0,
                            "message": {
                                "role": "assistant",
                                "content": null,
                                "tool_calls": [{
                                    "id": "call-1",
                                    "type": "function",
                                    "function": {"name": "search_jobs", "arguments": "{\"what\":\"data analyst\"}"}
                                }]
                            },
                            "finish_reason": "tool_calls"
                        }],
                        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
                    }))
                }
            }),
        );
        let base_url = start_test_server(app).await;
        let provider = provider_for(&base_url);

        let response = provider.complete(&request_with_tools()).await.unwrap();
        let message = &response.choices[0].message;
        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "search_jobs");
        assert_eq!(response.usage.unwrap().total_tokens, 15);

        let (auth, body) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(auth, "Bearer test-key");
        assert_eq!(body["model"], "gemini-2.5-flash");
        assert_eq!(body["messages"][1]["content"], "jobs in Singapore?");
    }

    #[tokio::test]
    async fn test_complete_maps_status_codes() {
        let app = Router::new()
            .route(
                "/unauthorized/chat/completions",
                post(|| async { axum::http::StatusCode::UNAUTHORIZED }),
            )
            .route(
                "/bad/chat/completions",
                post(|| async {
                    (
                        axum::http::StatusCode::BAD_REQUEST,
                        Json(serde_json::json!([{"error": {"message": "API key not valid"}}])),
                    )
                }),
            );
        let base_url = start_test_server(app).await;

        let err = provider_for(&format!("{base_url}/unauthorized"))
            .complete(&request_with_tools())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Auth { .. }));

        let err = provider_for(&format!("{base_url}/bad"))
            .complete(&request_with_tools())
            .await
            .unwrap_err();
        match err {
            ProviderError::InvalidRequest { message } => assert_eq!(message, "API key not valid"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
