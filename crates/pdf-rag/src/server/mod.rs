//! HTTP server for PDF question answering

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// PDF question-answering HTTP server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a server backed by the configured Ollama server
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create a server around prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .route("/info", get(info))
            .nest("/pdf", routes::pdf_routes(self.config.server.max_upload_size))
            .merge(routes::question_routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Starting PDF RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Liveness
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness: every provider must answer its health check
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let embedder = state.embedding_provider().health_check().await.unwrap_or(false);
    let llm = state.llm_provider().health_check().await.unwrap_or(false);
    let store = state
        .vector_store_provider()
        .health_check()
        .await
        .unwrap_or(false);

    let status = if embedder && llm && store {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "embedding": embedder,
            "llm": llm,
            "vector_store": store,
        })),
    )
}

/// Service description
async fn info(State(state): State<AppState>) -> Json<Value> {
    let chunks = state.vector_store_provider().len().await.unwrap_or(0);

    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Upload PDFs and ask questions answered from their content",
        "models": {
            "embedding": state.config().llm.embed_model,
            "llm": state.llm_provider().model(),
        },
        "documents": state.list_documents().len(),
        "chunks": chunks,
        "endpoints": {
            "POST /pdf/upload": "Upload a PDF (multipart field 'file') and index it",
            "GET /pdf/documents": "List indexed documents",
            "GET /pdf/documents/:id": "Get document details",
            "DELETE /pdf/documents/:id": "Remove a document and its chunks",
            "POST /question": "Ask a question: {\"question\": \"...\"}",
        },
    }))
}
