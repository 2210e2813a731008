//! Configuration for the agronomy assistant
//!
//! Defaults mirror the deployed layout (`documents/`, `reports/`, port 8000).
//! A TOML file can override any section and the usual environment variables
//! (`SUPABASE_URL`, `SUPABASE_SERVICE_KEY`, `GOOGLE_API_KEY`, `API_BASE_URL`)
//! are applied last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable pointing at an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "AGRO_RAG_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Supabase vector table configuration
    pub supabase: SupabaseConfig,
    /// Gemini chat and embedding configuration
    pub gemini: GeminiConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ingestion configuration
    pub ingestion: IngestionConfig,
    /// Report tool configuration
    pub reports: ReportConfig,
    /// Agent configuration
    pub agent: AgentConfig,
}

impl RagConfig {
    /// Load configuration: defaults, then the optional TOML file, then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("SUPABASE_URL") {
            self.supabase.url = url;
        }
        if let Some(key) = var("SUPABASE_SERVICE_KEY") {
            self.supabase.service_key = key;
        }
        if let Some(key) = var("GOOGLE_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Some(base) = var("API_BASE_URL") {
            self.reports.public_base_url = base;
        }
        if let Some(host) = var("AGRO_RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("AGRO_RAG_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid AGRO_RAG_PORT={}", port),
            }
        }
    }

    /// Check that the hosted-service credentials are present
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.supabase.url.trim().is_empty() {
            missing.push("SUPABASE_URL");
        }
        if self.supabase.service_key.trim().is_empty() {
            missing.push("SUPABASE_SERVICE_KEY");
        }
        if self.gemini.api_key.trim().is_empty() {
            missing.push("GOOGLE_API_KEY");
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing credentials: {}",
                missing.join(", ")
            )));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// File written when the agent cannot be initialized
    pub debug_log_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug_log_path: PathBuf::from("debug_error.log"),
        }
    }
}

/// Supabase (PostgREST) vector table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Service role key
    #[serde(skip_serializing)]
    pub service_key: String,
    /// Table holding chunks and embeddings
    pub table: String,
    /// RPC function used for similarity search
    pub query_name: String,
    /// Rows per insert request
    pub upsert_batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            table: "documents".to_string(),
            query_name: "match_documents".to_string(),
            upsert_batch_size: 500,
            timeout_secs: 120,
        }
    }
}

/// Gemini configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key
    #[serde(skip_serializing)]
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Chat model with function calling
    pub chat_model: String,
    /// Embedding model
    pub embed_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling
    pub top_p: f32,
    /// Maximum output tokens per response
    pub max_output_tokens: u32,
    /// Texts per batch embedding request
    pub embed_batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            chat_model: "gemini-flash-latest".to_string(),
            embed_model: "embedding-001".to_string(),
            temperature: 1.0,
            top_p: 1.0,
            max_output_tokens: 8192,
            embed_batch_size: 100,
            timeout_secs: 120,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Overlap between windows in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Directory holding the PDFs and spreadsheets
    pub documents_dir: PathBuf,
    /// Filename fragment selecting the recommendation-sheet policy
    pub recommendation_pattern: String,
    /// Label prefixed to every recommendation-row document
    pub recommendation_label: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("documents"),
            recommendation_pattern: "RiceRecommendationData".to_string(),
            recommendation_label: "Rice Recommendation Data:".to_string(),
        }
    }
}

/// Report tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Crop-record spreadsheet
    pub data_path: PathBuf,
    /// Where generated PDFs are written (and served from)
    pub output_dir: PathBuf,
    /// Base URL used to build download links
    pub public_base_url: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("documents").join("Cleaned_Data.xlsx"),
            output_dir: PathBuf::from("reports"),
            public_base_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Base system instruction
    pub base_instruction: String,
    /// Number of chunks returned by the retrieval tool
    pub retrieval_k: usize,
    /// Optional cap on model round-trips per turn (unbounded when unset)
    pub max_iterations: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_instruction: "You are a helpful assistant".to_string(),
            retrieval_k: 2,
            max_iterations: None,
        }
    }
}
