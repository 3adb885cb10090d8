//! The stateful proposal service.
//!
//! Holds a single in-memory conversation and runs one graph turn at a time.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::graph::ProposalGraph;
use super::state::{GraphState, Session};
use super::tool::DocumentTool;
use crate::ai::ChatModel;
use crate::core::DocumentsConfig;
use crate::render::RenderedDocument;

/// Service error types.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("Message must not be empty")]
    EmptyMessage,
}

/// Outcome of one chat turn.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// Text shown to the user
    pub reply: String,
    /// Present when the turn produced a file
    pub document: Option<RenderedDocument>,
}

/// Conversational proposal writer.
pub struct ProposalService {
    graph: ProposalGraph,
    session: Mutex<Session>,
}

impl ProposalService {
    pub fn new(graph: ProposalGraph) -> Self {
        Self { graph, session: Mutex::new(Session::default()) }
    }

    /// Wire up a service with the document tool described by `documents`.
    pub fn with_model(model: Arc<dyn ChatModel>, documents: &DocumentsConfig) -> Self {
        let tool = DocumentTool::new(documents.default_format)
            .with_output_dir(documents.output_dir.clone());
        let graph =
            ProposalGraph::new(model, Arc::new(tool)).with_default_format(documents.default_format);
        Self::new(graph)
    }

    /// Process one user message.
    pub async fn interact(&self, input: &str) -> Result<ChatReply, ProposalError> {
        if input.trim().is_empty() {
            return Err(ProposalError::EmptyMessage);
        }

        let mut session = self.session.lock().await;
        let state = GraphState::from_session(input, &session);
        let result = self.graph.invoke(state).await;
        result.write_back(&mut session);

        tracing::debug!(
            history = session.history.len(),
            doc_ready = result.doc_ready,
            "Turn complete"
        );

        let document = if result.doc_ready { result.document } else { None };
        Ok(ChatReply { reply: result.message, document })
    }

    /// Forget the conversation.
    pub async fn reset(&self) {
        self.session.lock().await.clear();
        tracing::info!("Session reset");
    }

    pub async fn current_draft(&self) -> String {
        self.session.lock().await.draft.clone()
    }

    pub async fn history(&self) -> Vec<String> {
        self.session.lock().await.history.clone()
    }

    /// Snapshot of the whole session.
    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::agent::graph::{DOC_READY_MESSAGE, NO_CONTENT_MESSAGE};
    use crate::ai::{AIError, ChatMessage};
    use crate::render::DocumentFormat;

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, AIError> {
            Ok("**Project Overview**\nGenerated draft\n\n**Next Steps**\n- Sign".to_string())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn service() -> ProposalService {
        ProposalService::with_model(Arc::new(EchoModel), &DocumentsConfig::default())
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let err = service().interact("   ").await.unwrap_err();
        assert!(matches!(err, ProposalError::EmptyMessage));
    }

    #[tokio::test]
    async fn test_draft_then_document() {
        let service = service();

        let reply = service.interact("Project name: Acme").await.unwrap();
        assert!(reply.document.is_none());
        assert!(reply.reply.contains("Generated draft"));
        assert_eq!(service.history().await.len(), 2);
        assert_eq!(service.session().await.project_name, "Acme");

        let reply = service.interact("make doc").await.unwrap();
        assert_eq!(reply.reply, DOC_READY_MESSAGE);
        let document = reply.document.unwrap();
        assert_eq!(document.format, DocumentFormat::Docx);
        assert_eq!(document.filename, "acme-development-proposal.docx");

        // Rendering does not touch the conversation.
        assert_eq!(service.history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_reset_clears_session() {
        let service = service();
        service.interact("Budget: $4,000").await.unwrap();
        assert!(!service.current_draft().await.is_empty());

        service.reset().await;
        assert_eq!(service.session().await, Session::default());

        let reply = service.interact("make pdf").await.unwrap();
        assert_eq!(reply.reply, NO_CONTENT_MESSAGE);
        assert!(reply.document.is_none());
    }
}
