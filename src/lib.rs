//! # Proposal Agent
//!
//! Conversational web-development proposal writer.
//!
//! Collects project requirements from free-text chat messages, keeps a
//! running proposal draft written by a language model, and renders that
//! draft into a downloadable PDF or Word document on request.
//!
//! ## Features
//!
//! - **Preference Extraction**: project name, budget, timeline and requirements pulled from chat text
//! - **Draft Generation**: any OpenAI-compatible chat-completions endpoint (Groq by default)
//! - **Document Rendering**: paginated A4 PDF and `.docx` output
//! - **HTTP API**: `/chat-proposal` endpoints served with axum
//!
//! ## Quick Start
//!
//! ```bash
//! export GROQ_API_KEY=...
//!
//! # Serve the HTTP API
//! proposal-agent serve
//!
//! # Or chat in the terminal
//! proposal-agent chat
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::uninlined_format_args)]

pub mod agent;
pub mod ai;
pub mod api;
pub mod core;
pub mod render;

// Re-export commonly used types
pub use agent::{extract_user_preferences, ChatReply, ProposalError, ProposalService, UserPreferences};
pub use ai::{AIError, ChatMessage, ChatModel, OpenAICompatibleProvider};
pub use core::Config;
pub use render::{render, DocumentFormat, RenderError, RenderedDocument};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "proposal-agent";
