//! The proposal workflow graph.
//!
//! Each chat turn runs through a fixed set of nodes:
//!
//! ```text
//! ProcessRequest --(tool call pending)--> GenerateDocTool --> HandleDocResult --> end
//!        \--(otherwise)--> end
//! ```
//!
//! `ProcessRequest` either extends the draft with a model call or, when the
//! user asks for a document, queues a `generate_proposal_doc` tool call.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::extract::extract_user_preferences;
use super::prompt::{proposal_prompt, PromptContext};
use super::state::{GraphMessage, GraphState};
use super::tool::{ToolCall, ToolExecutor, GENERATE_PROPOSAL_DOC};
use crate::ai::{ChatMessage, ChatModel};
use crate::render::{DocumentFormat, DEFAULT_TITLE};

pub const NO_CONTENT_MESSAGE: &str =
    "No proposal content available. Please generate a proposal first.";
pub const GENERATING_MESSAGE: &str = "Generating your proposal DOC...";
pub const MODEL_ERROR_MESSAGE: &str = "Error generating response. Please try again.";
pub const DOC_FAILED_MESSAGE: &str = "Failed to generate DOC.";
pub const DOC_READY_MESSAGE: &str = "Proposal DOC generated successfully!";

const EMPTY_REPLY: &str = "No response generated";

/// Nodes of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    ProcessRequest,
    GenerateDocTool,
    HandleDocResult,
}

/// Work out whether the user is asking for a document, and which kind.
///
/// "make pdf" / "generate pdf" always mean PDF; "make doc" / "generate doc"
/// mean `default_format`.
pub fn detect_document_intent(input: &str, default_format: DocumentFormat) -> Option<DocumentFormat> {
    let lower = input.to_lowercase();

    if lower.contains("make pdf") || lower.contains("generate pdf") {
        Some(DocumentFormat::Pdf)
    } else if lower.contains("make doc") || lower.contains("generate doc") {
        Some(default_format)
    } else {
        None
    }
}

/// Today's date as MM/DD/YYYY.
pub fn today() -> String {
    chrono::Local::now().format("%m/%d/%Y").to_string()
}

/// Stored requirements followed by new ones, without repeats.
pub fn merge_requirements(stored: &[String], extracted: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(stored.len() + extracted.len());
    for item in stored.iter().chain(extracted) {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

/// The compiled workflow.
pub struct ProposalGraph {
    model: Arc<dyn ChatModel>,
    tools: Arc<dyn ToolExecutor>,
    default_format: DocumentFormat,
}

impl ProposalGraph {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self { model, tools, default_format: DocumentFormat::default() }
    }

    /// Format used for "make doc" requests.
    pub fn with_default_format(mut self, format: DocumentFormat) -> Self {
        self.default_format = format;
        self
    }

    /// Run the graph to completion.
    pub async fn invoke(&self, mut state: GraphState) -> GraphState {
        let mut next = Some(Node::ProcessRequest);

        while let Some(node) = next {
            tracing::debug!(?node, "Running graph node");
            next = match node {
                Node::ProcessRequest => {
                    self.process_request(&mut state).await;
                    Self::route(&state)
                }
                Node::GenerateDocTool => {
                    self.generate_doc_tool(&mut state).await;
                    Some(Node::HandleDocResult)
                }
                Node::HandleDocResult => {
                    Self::handle_doc_result(&mut state);
                    None
                }
            };
        }

        state
    }

    /// Edge out of `ProcessRequest`.
    pub fn route(state: &GraphState) -> Option<Node> {
        match state.last_message() {
            Some(message) if !message.tool_calls().is_empty() => Some(Node::GenerateDocTool),
            _ => None,
        }
    }

    async fn process_request(&self, state: &mut GraphState) {
        match detect_document_intent(&state.user_input, self.default_format) {
            Some(format) => Self::request_document(state, format),
            None => self.extend_draft(state).await,
        }
    }

    fn request_document(state: &mut GraphState, format: DocumentFormat) {
        if state.draft.trim().is_empty() {
            state.message = NO_CONTENT_MESSAGE.to_string();
            state.doc_ready = false;
            return;
        }

        let arguments = HashMap::from([
            ("content".to_string(), Value::String(state.draft.clone())),
            ("title".to_string(), Value::String(state.title.clone())),
            ("date".to_string(), Value::String(today())),
            ("format".to_string(), Value::String(format.to_string())),
        ]);
        let call = ToolCall::new(GENERATE_PROPOSAL_DOC, arguments);
        tracing::info!(call_id = %call.id, format = %format, "Document requested");

        state.message = GENERATING_MESSAGE.to_string();
        state.messages.push(GraphMessage::Assistant { content: None, tool_calls: vec![call] });
    }

    async fn extend_draft(&self, state: &mut GraphState) {
        let extracted = extract_user_preferences(&state.user_input);

        let timeline = if state.user_timeline.is_empty() {
            extracted.timeline.clone()
        } else {
            state.user_timeline.clone()
        };
        let budget =
            if state.user_budget.is_empty() { extracted.budget.clone() } else { state.user_budget.clone() };
        let requirements = merge_requirements(&state.user_requirements, &extracted.requirements);

        let (title, project_name) = if !extracted.title.is_empty() {
            (format!("{} - Development Proposal", extracted.title), extracted.title.clone())
        } else if !state.project_name.is_empty() {
            (format!("{} - Development Proposal", state.project_name), state.project_name.clone())
        } else if !state.title.is_empty() {
            (state.title.clone(), String::new())
        } else {
            (DEFAULT_TITLE.to_string(), String::new())
        };

        let prompt = proposal_prompt(&PromptContext {
            user_input: &state.user_input,
            draft: &state.draft,
            timeline: &timeline,
            budget: &budget,
            requirements: &requirements,
        });

        match self.model.complete(&[ChatMessage::user(prompt)]).await {
            Ok(reply) => {
                let reply = if reply.trim().is_empty() { EMPTY_REPLY.to_string() } else { reply };
                tracing::info!(model = self.model.name(), chars = reply.len(), %title, "Draft updated");

                state.history.push(state.user_input.clone());
                state.history.push(reply.clone());
                state.draft.clone_from(&reply);
                state.message = reply;
                state.doc_ready = false;
                state.title = title;
                state.project_name = project_name;
                state.user_timeline = timeline;
                state.user_budget = budget;
                state.user_requirements = requirements;
            }
            Err(e) => {
                tracing::error!(model = self.model.name(), error = %e, "Model call failed");
                state.message = MODEL_ERROR_MESSAGE.to_string();
            }
        }
    }

    async fn generate_doc_tool(&self, state: &mut GraphState) {
        let calls: Vec<ToolCall> =
            state.last_message().map(|m| m.tool_calls().to_vec()).unwrap_or_default();

        for call in &calls {
            let result = self.tools.execute(call).await;
            tracing::debug!(call_id = %call.id, success = result.success, output = %result.output, "Tool finished");
            state.messages.push(GraphMessage::Tool(result));
        }
    }

    fn handle_doc_result(state: &mut GraphState) {
        let document = state
            .latest_tool_result()
            .filter(|result| result.success)
            .and_then(|result| result.document.clone());

        match document {
            Some(document) => {
                state.document = Some(document);
                state.message = DOC_READY_MESSAGE.to_string();
                state.doc_ready = true;
            }
            None => {
                state.message = DOC_FAILED_MESSAGE.to_string();
                state.doc_ready = false;
            }
        }
    }
}
