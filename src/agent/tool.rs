//! The document generation tool.
//!
//! The workflow graph requests documents through tool calls, the same
//! shape a function-calling model would emit, and this executor fulfils
//! them with the renderers in [`crate::render`].

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::render::{self, DocumentFormat, RenderedDocument};

/// Name of the proposal document tool.
pub const GENERATE_PROPOSAL_DOC: &str = "generate_proposal_doc";

/// A tool call requested by the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool arguments
    pub arguments: HashMap<String, Value>,
}

impl ToolCall {
    /// Create a call with a fresh ID.
    pub fn new(name: impl Into<String>, arguments: HashMap<String, Value>) -> Self {
        Self { id: format!("call_{}", uuid::Uuid::new_v4().simple()), name: name.into(), arguments }
    }

    fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Result of executing a tool.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// ID of the tool call this is a response to
    pub tool_call_id: String,
    /// Whether the tool execution was successful
    pub success: bool,
    /// Human-readable outcome
    pub output: String,
    /// The rendered file, on success
    pub document: Option<RenderedDocument>,
}

impl ToolResult {
    fn failure(call: &ToolCall, output: impl Into<String>) -> Self {
        Self { tool_call_id: call.id.clone(), success: false, output: output.into(), document: None }
    }
}

/// Trait for executing tools.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool call.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

/// Renders proposal drafts into PDF or Word documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentTool {
    default_format: DocumentFormat,
    output_dir: Option<PathBuf>,
}

impl DocumentTool {
    pub fn new(default_format: DocumentFormat) -> Self {
        Self { default_format, output_dir: None }
    }

    /// Keep a copy of every rendered document in `dir`.
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    fn generate(&self, call: &ToolCall) -> ToolResult {
        let Some(content) = call.str_arg("content") else {
            return ToolResult::failure(call, "Missing required argument: content");
        };
        let title = call.str_arg("title").unwrap_or_default();
        let date = call.str_arg("date").filter(|d| !d.trim().is_empty());
        let format = match call.str_arg("format") {
            Some(raw) => match raw.parse::<DocumentFormat>() {
                Ok(format) => format,
                Err(e) => return ToolResult::failure(call, e.to_string()),
            },
            None => self.default_format,
        };

        tracing::info!(
            title = %title.chars().take(50).collect::<String>(),
            content_length = content.len(),
            format = %format,
            "Generating proposal document"
        );

        let document = match render::render(format, title, content, date) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(error = %e, "Document rendering failed");
                return ToolResult::failure(call, format!("Failed to render document: {e}"));
            }
        };

        if let Some(dir) = &self.output_dir {
            match document.save_to(dir) {
                Ok(path) => tracing::info!(path = %path.display(), "Saved proposal copy"),
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Could not save proposal copy"),
            }
        }

        ToolResult {
            tool_call_id: call.id.clone(),
            success: true,
            output: format!("Generated {} ({} bytes)", document.filename, document.len()),
            document: Some(document),
        }
    }
}

#[async_trait]
impl ToolExecutor for DocumentTool {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if call.name != GENERATE_PROPOSAL_DOC {
            tracing::warn!(tool = %call.name, "Unknown tool requested");
            return ToolResult::failure(call, format!("Unknown tool: {}", call.name));
        }

        self.generate(call)
    }
}
