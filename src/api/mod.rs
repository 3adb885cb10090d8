//! REST API for the proposal agent.
//!
//! Routes:
//!
//! - `POST /chat-proposal` - send a message, receive a reply or a document
//! - `POST /chat-proposal/reset` - start over
//! - `GET /chat-proposal/draft` - current draft and history
//! - `GET /health` - liveness

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agent::{ProposalError, ProposalService};
use crate::core::ServerConfig;
use crate::render::RenderedDocument;

const INTERNAL_ERROR_MESSAGE: &str = "Failed to process your request. Please try again.";

/// API error types.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ProposalError> for ApiError {
    fn from(err: ProposalError) -> Self {
        match err {
            ProposalError::EmptyMessage => Self::BadRequest(err.to_string()),
        }
    }
}

/// JSON error payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, ErrorBody { error: "Bad request".to_string(), message })
            }
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Internal server error".to_string(),
                        message: INTERNAL_ERROR_MESSAGE.to_string(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Body of `POST /chat-proposal`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Text reply for turns that produce no document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Body of `GET /chat-proposal/draft`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftResponse {
    pub draft: String,
    pub history: Vec<String>,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ProposalService>,
}

/// Build the application router.
pub fn router(service: Arc<ProposalService>, cors_enabled: bool) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/chat-proposal", post(chat))
        .route("/chat-proposal/reset", post(reset))
        .route("/chat-proposal/draft", get(draft))
        .with_state(AppState { service })
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind and serve until the process is stopped.
pub async fn run_server(service: Arc<ProposalService>, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let app = router(service, config.cors_enabled);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, cors = config.cors_enabled, "Proposal API listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "version": crate::VERSION }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = request.message.unwrap_or_default();
    let result = state.service.interact(&message).await?;

    match result.document {
        Some(document) => document_response(document),
        None => Ok(Json(ChatResponse { reply: result.reply }).into_response()),
    }
}

async fn reset(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.service.reset().await;
    Json(serde_json::json!({ "message": "Session reset successfully" }))
}

async fn draft(State(state): State<AppState>) -> Json<DraftResponse> {
    Json(DraftResponse {
        draft: state.service.current_draft().await,
        history: state.service.history().await,
    })
}

fn document_response(document: RenderedDocument) -> Result<Response, ApiError> {
    tracing::info!(filename = %document.filename, size = document.len(), "Sending document");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, document.content_type())
        .header(header::CONTENT_DISPOSITION, format!("attachment; filename={}", document.filename))
        .header(header::CONTENT_LENGTH, document.len())
        .body(Body::from(document.bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
