//! Configuration management.
//!
//! Handles loading configuration from TOML files. Secrets never live in
//! the file: the LLM API key is read from the environment (a `.env` file
//! is honoured, see `main.rs`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::RetryConfig;
use crate::render::DocumentFormat;

/// Local config file name, looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "proposal-agent.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Language model settings
    pub llm: LlmConfig,

    /// Document output settings
    pub documents: DocumentsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1)
    pub host: String,

    /// Port to bind to (default: 3000)
    pub port: u16,

    /// Whether to allow cross-origin requests from any origin
    pub cors_enabled: bool,
}

/// Language model settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token limit (provider default if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries for rate limits and upstream failures
    pub max_retries: u32,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

/// Document output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Format used for "make doc" / "generate doc" requests
    pub default_format: DocumentFormat,

    /// Also write every rendered document here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 3000, cors_enabled: false }
    }
}

impl ServerConfig {
    /// Get the socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.3,
            max_tokens: None,
            timeout_secs: 60,
            max_retries: 2,
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("{} not set", self.api_key_env))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::api().with_max_attempts(self.max_retries)
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `proposal-agent.toml` in current directory
    /// 2. `~/.config/proposal-agent/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        if let Some(path) = Self::resolve_path() {
            return Self::load_from_file(&path);
        }
        Ok(Self::default())
    }

    /// The config file `load` would read, if any exists.
    pub fn resolve_path() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        Self::config_dir().map(|dir| dir.join("config.toml")).filter(|path| path.exists())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("proposal-agent"))
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
