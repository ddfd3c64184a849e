//! PDF RAG server binary
//!
//! Run with: cargo run -p pdf-rag --bin pdf-rag-server -- --config pdf-rag.toml

use clap::Parser;
use pdf_rag::{generation::OllamaClient, RagConfig, RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upload PDFs and ask questions answered from their content
#[derive(Debug, Parser)]
#[command(name = "pdf-rag-server", version, about)]
struct Args {
    /// TOML configuration file (defaults to $PDF_RAG_CONFIG, then built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding the configuration
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Vector store: {}", config.vector_db.storage_path.display());
    tracing::info!("  - Upload folder: {}", config.upload.upload_path.display());

    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    if OllamaClient::new(&config.llm)?.health_check().await? {
        tracing::info!("Ollama is running");
    } else {
        tracing::warn!("Ollama not available at {}", config.llm.base_url);
        tracing::warn!(
            "Start it with `ollama serve` and pull the models: ollama pull {} && ollama pull {}",
            config.llm.embed_model,
            config.llm.generate_model
        );
    }

    let server = RagServer::new(config).await?;

    tracing::info!("Health: http://{}/health", server.address());
    tracing::info!("Info:   http://{}/info", server.address());

    server.start().await?;

    Ok(())
}
