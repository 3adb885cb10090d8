//! Proposal drafting agent.
//!
//! ## Features
//!
//! - Regex extraction of project name, budget, timeline and requirements
//! - Draft generation through a language model
//! - **Document tool** - renders the draft as PDF or Word on request

mod extract;
mod graph;
mod prompt;
mod service;
mod state;
mod tool;

pub use extract::{extract_user_preferences, split_requirements, UserPreferences};
pub use graph::{
    detect_document_intent, merge_requirements, today, Node, ProposalGraph, DOC_FAILED_MESSAGE,
    DOC_READY_MESSAGE, GENERATING_MESSAGE, MODEL_ERROR_MESSAGE, NO_CONTENT_MESSAGE,
};
pub use prompt::{proposal_prompt, PromptContext, EMPTY_DRAFT};
pub use service::{ChatReply, ProposalError, ProposalService};
pub use state::{GraphMessage, GraphState, Session};
pub use tool::{DocumentTool, ToolCall, ToolExecutor, ToolResult, GENERATE_PROPOSAL_DOC};
