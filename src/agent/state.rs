//! Conversation state carried between turns and through the graph.

use super::tool::{ToolCall, ToolResult};
use crate::render::RenderedDocument;

/// A message produced while running the graph.
#[derive(Debug, Clone)]
pub enum GraphMessage {
    /// Assistant message (may include tool calls)
    Assistant { content: Option<String>, tool_calls: Vec<ToolCall> },

    /// Tool result message
    Tool(ToolResult),
}

impl GraphMessage {
    /// Tool calls carried by an assistant message.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            Self::Tool(_) => &[],
        }
    }
}

/// What survives between chat turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Alternating user inputs and model replies
    pub history: Vec<String>,
    /// Latest full proposal text
    pub draft: String,
    pub title: String,
    pub project_name: String,
    pub timeline: String,
    pub budget: String,
    pub requirements: Vec<String>,
}

impl Session {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// State for a single run of the workflow graph.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    pub user_input: String,
    pub draft: String,
    pub title: String,
    pub project_name: String,
    pub history: Vec<String>,
    pub user_timeline: String,
    pub user_budget: String,
    pub user_requirements: Vec<String>,

    /// Reply shown to the user
    pub message: String,
    /// Set once a document has been rendered this turn
    pub doc_ready: bool,
    pub document: Option<RenderedDocument>,
    pub messages: Vec<GraphMessage>,
}

impl GraphState {
    /// Seed a run from the stored session.
    pub fn from_session(user_input: impl Into<String>, session: &Session) -> Self {
        Self {
            user_input: user_input.into(),
            draft: session.draft.clone(),
            title: session.title.clone(),
            project_name: session.project_name.clone(),
            history: session.history.clone(),
            user_timeline: session.timeline.clone(),
            user_budget: session.budget.clone(),
            user_requirements: session.requirements.clone(),
            ..Default::default()
        }
    }

    /// Write the conversation fields back into the session.
    pub fn write_back(&self, session: &mut Session) {
        session.history.clone_from(&self.history);
        session.draft.clone_from(&self.draft);
        session.title.clone_from(&self.title);
        session.project_name.clone_from(&self.project_name);
        session.timeline.clone_from(&self.user_timeline);
        session.budget.clone_from(&self.user_budget);
        session.requirements.clone_from(&self.user_requirements);
    }

    /// The most recent graph message, if any.
    pub fn last_message(&self) -> Option<&GraphMessage> {
        self.messages.last()
    }

    /// The most recent tool result, if any.
    pub fn latest_tool_result(&self) -> Option<&ToolResult> {
        self.messages.iter().rev().find_map(|m| match m {
            GraphMessage::Tool(result) => Some(result),
            GraphMessage::Assistant { .. } => None,
        })
    }
}
