//! Core functionality shared by the service, the CLI and the HTTP API.
//!
//! This module contains configuration loading and retry handling.

mod config;
mod retry;

pub use config::{Config, DocumentsConfig, LlmConfig, ServerConfig, LOCAL_CONFIG_FILE};
pub use retry::{retry_async, RetryConfig};
