//! Batch ingestion of the documents directory into the vector table
//!
//! Run with: cargo run -p agro-rag --bin agro-rag-ingest -- --documents-dir documents

use agro_rag::{
    config::RagConfig,
    providers::{GeminiClient, SupabaseVectorStore, VectorStoreProvider},
    IngestPipeline,
};
use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "agro-rag-ingest", version, about = "Load PDFs and spreadsheets into the vector store")]
struct Cli {
    /// Directory holding the PDF and .xlsx files
    #[arg(long)]
    documents_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Parse and chunk only; nothing is embedded or uploaded
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agro_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = RagConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.documents_dir {
        config.ingestion.documents_dir = dir;
    }

    let pipeline = IngestPipeline::from_config(&config);
    let dir = config.ingestion.documents_dir.clone();
    let (chunks, mut report) = pipeline
        .prepare(&dir)
        .with_context(|| format!("Failed to load documents from {}", dir.display()))?;

    if cli.dry_run {
        tracing::info!("Dry run: {} chunks prepared, nothing uploaded", chunks.len());
        report.log_summary();
        return Ok(());
    }

    config.validate()?;
    let embedder = GeminiClient::new(&config.gemini)?;
    let store = SupabaseVectorStore::new(&config.supabase)?;

    tracing::info!("Ingesting {} chunks into {}...", chunks.len(), store.name());

    let bar = ProgressBar::new(chunks.len() as u64).with_style(
        ProgressStyle::with_template("{bar:40} [{pos}/{len}] chunks {msg}")
            .context("invalid progress template")?,
    );

    report.uploaded = pipeline
        .embed_and_store(
            chunks,
            &embedder,
            &store,
            config.supabase.upsert_batch_size,
            |stored| bar.inc(stored as u64),
        )
        .await
        .context("Upload failed")?;
    bar.finish_with_message("uploaded");

    report.log_summary();
    tracing::info!("Ingestion complete.");

    Ok(())
}
