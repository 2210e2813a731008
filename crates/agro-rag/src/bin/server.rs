//! Agronomy assistant HTTP server
//!
//! Run with: cargo run -p agro-rag --bin agro-rag-server

use agro_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agro_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Defaults, then AGRO_RAG_CONFIG, then environment
    let config = RagConfig::load(None)?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Chat model: {}", config.gemini.chat_model);
    tracing::info!("  - Embedding model: {}", config.gemini.embed_model);
    tracing::info!("  - Vector table: {}", config.supabase.table);
    tracing::info!("  - Reports: {}", config.reports.output_dir.display());
    tracing::info!("  - Public base URL: {}", config.reports.public_base_url);

    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  Ask:     POST http://{}/ask", server.address());
    println!("  Health:  http://{}/health", server.address());
    println!("  Reports: http://{}/reports/<file>", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
