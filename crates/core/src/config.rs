//! jobassist configuration
//!
//! YAML config file plus environment variable overrides.
//! Precedence: environment > file > defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::llm::{ProviderConfig, ProviderType};

/// Hosted Adzuna MCP endpoint used when nothing overrides it
pub const DEFAULT_MCP_SERVER_URL: &str =
    "https://adzuna-mcp-server-236255620233.us-central1.run.app/mcp";

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "jobassist.yaml";

pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_MCP_SERVER_URL: &str = "ADZUNA_MCP_SERVER_URL";
pub const ENV_MODEL: &str = "JOBASSIST_MODEL";
pub const ENV_ADDRESS: &str = "JOBASSIST_ADDRESS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub mcp: McpSettings,

    #[serde(default)]
    pub agent: AgentSettings,

    #[serde(default)]
    pub server: ServerSettings,
}

/// LLM settings
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// `gemini` or `openai`
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Usually left unset and taken from `GOOGLE_API_KEY`
    pub api_key: Option<String>,

    pub base_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout: default_timeout(),
        }
    }
}

impl LlmSettings {
    /// API key, if one is configured and non-blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Build the provider configuration; `None` when no credential is set
    pub fn provider_config(&self) -> Option<ProviderConfig> {
        let api_key = self.credential()?;
        Some(ProviderConfig {
            name: self.provider.clone(),
            provider_type: ProviderType::from(self.provider.as_str()),
            api_key: api_key.to_string(),
            base_url: self.base_url.clone(),
            default_model: self.model.clone(),
            timeout_ms: self.timeout * 1000,
        })
    }
}

/// MCP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpSettings {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_mcp_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_server_url() -> String {
    DEFAULT_MCP_SERVER_URL.to_string()
}

fn default_mcp_timeout_ms() -> u64 {
    30_000
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            timeout_ms: default_mcp_timeout_ms(),
            headers: HashMap::new(),
        }
    }
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Upper bound on tool calls per question
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,

    /// Replaces the built-in system instruction
    pub system_prompt: Option<String>,
}

fn default_max_tool_calls() -> usize {
    25
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            system_prompt: None,
        }
    }
}

/// Web server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_address")]
    pub address: String,
}

fn default_address() -> String {
    "127.0.0.1:7860".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

/// Loads [`AssistantConfig`] from file and environment
#[derive(Debug, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit config file; it must exist
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Load file (if any) and overlay the process environment
    pub fn load(&self) -> Result<AssistantConfig, ConfigError> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Load with a custom environment lookup
    pub fn load_with_env<F>(&self, env: F) -> Result<AssistantConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.path {
            Some(path) => Self::read_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::read_file(default_path)?
                } else {
                    AssistantConfig::default()
                }
            }
        };

        apply_env_overrides(&mut config, env);
        validate(&config)?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<AssistantConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn apply_env_overrides<F>(config: &mut AssistantConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty(ENV_API_KEY) {
        config.llm.api_key = Some(key);
    }
    if let Some(url) = non_empty(ENV_MCP_SERVER_URL) {
        config.mcp.server_url = url;
    }
    if let Some(model) = non_empty(ENV_MODEL) {
        config.llm.model = model;
    }
    if let Some(address) = non_empty(ENV_ADDRESS) {
        config.server.address = address;
    }
}

fn validate(config: &AssistantConfig) -> Result<(), ConfigError> {
    let url = config.mcp.server_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Invalid(format!(
            "MCP server URL must be http(s): {}",
            config.mcp.server_url
        )));
    }
    if config.agent.max_tool_calls == 0 {
        return Err(ConfigError::Invalid(
            "agent.max_tool_calls must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.mcp.server_url, DEFAULT_MCP_SERVER_URL);
        assert_eq!(config.server.address, "127.0.0.1:7860");
        assert!(config.llm.credential().is_none());
        assert!(config.llm.provider_config().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env = |key: &str| match key {
            ENV_API_KEY => Some("AIza-test".to_string()),
            ENV_MCP_SERVER_URL => Some("http://localhost:9000/mcp".to_string()),
            ENV_MODEL => Some("   ".to_string()),
            _ => None,
        };
        let file = write_yaml("llm:\n  model: gemini-2.0-flash\n");
        let config = ConfigLoader::with_path(file.path()).load_with_env(env).unwrap();

        assert_eq!(config.llm.credential(), Some("AIza-test"));
        assert_eq!(config.mcp.server_url, "http://localhost:9000/mcp");
        // Blank env values do not override the file
        assert_eq!(config.llm.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_file_values() {
        let file = write_yaml(
            "mcp:\n  server_url: https://example.com/mcp\n  headers:\n    X-Trace: on\nagent:\n  max_tool_calls: 5\nserver:\n  address: 0.0.0.0:8080\n",
        );
        let config = ConfigLoader::with_path(file.path()).load_with_env(no_env).unwrap();

        assert_eq!(config.mcp.server_url, "https://example.com/mcp");
        assert_eq!(config.mcp.headers.get("X-Trace").map(String::as_str), Some("on"));
        assert_eq!(config.mcp.timeout_ms, 30_000);
        assert_eq!(config.agent.max_tool_calls, 5);
        assert_eq!(config.server.address, "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = ConfigLoader::with_path("/definitely/not/here.yaml")
            .load_with_env(no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let file = write_yaml("mcp:\n  server_url: ftp://example.com\n");
        let err = ConfigLoader::with_path(file.path()).load_with_env(no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_provider_config_from_settings() {
        let settings = LlmSettings {
            api_key: Some("  AIzaSyExample  ".to_string()),
            timeout: 10,
            ..LlmSettings::default()
        };
        let provider = settings.provider_config().unwrap();
        assert_eq!(provider.api_key, "AIzaSyExample");
        assert_eq!(provider.provider_type, ProviderType::Gemini);
        assert_eq!(provider.timeout_ms, 10_000);
        assert!(!format!("{:?}", settings).contains("AIzaSyExample"));
    }

    fn write_yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}
