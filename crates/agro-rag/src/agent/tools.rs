//! Tools exposed to the model

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::providers::{EmbeddingProvider, ToolCall, ToolOutput, ToolSpec, VectorStoreProvider};

use super::prompt::PromptBuilder;
use super::report::{ReportError, ReportGenerator};

/// Tool failure. Rendered to text for the model, never raised to the caller.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] crate::Error),

    #[error("{0}")]
    Report(#[from] ReportError),

    #[error("Tool task failed: {0}")]
    Task(String),
}

/// A function the model can call
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    async fn call(&self, args: &Value) -> Result<String, ToolError>;

    /// Whether the services behind the tool answer
    async fn health_check(&self) -> bool {
        true
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Read a string argument; numbers are accepted and turned into text
fn string_arg(tool: &str, args: &Value, key: &str) -> Result<String, ToolError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("missing string argument '{}'", key),
        }),
    }
}

/// Semantic search over the ingested documents
pub struct RetrieveTool {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    k: usize,
}

impl RetrieveTool {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStoreProvider>, k: usize) -> Self {
        Self { embedder, store, k }
    }
}

#[async_trait]
impl Tool for RetrieveTool {
    fn name(&self) -> &str {
        "retrieve"
    }

    fn description(&self) -> &str {
        "Retrieve information related to a query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "query": {"type": "STRING", "description": "What to search for."}
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: &Value) -> Result<String, ToolError> {
        let query = string_arg(self.name(), args, "query")?;
        let embedding = self.embedder.embed_query(&query).await?;
        let results = self.store.search(&embedding, self.k).await?;
        tracing::debug!("retrieve({:?}) returned {} hit(s)", query, results.len());
        Ok(PromptBuilder::build_context(&results))
    }

    async fn health_check(&self) -> bool {
        let embedder = self.embedder.health_check().await;
        let store = self.store.health_check().await;
        match (embedder, store) {
            (Ok(true), Ok(true)) => true,
            (embedder, store) => {
                tracing::warn!(
                    "retrieve backends unhealthy: {}={:?}, {}={:?}",
                    self.embedder.name(),
                    embedder,
                    self.store.name(),
                    store
                );
                false
            }
        }
    }
}

/// PDF report for a year and village
pub struct ReportTool {
    generator: Arc<ReportGenerator>,
}

impl ReportTool {
    pub fn new(generator: ReportGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }
}

#[async_trait]
impl Tool for ReportTool {
    fn name(&self) -> &str {
        "generate_report"
    }

    fn description(&self) -> &str {
        "Generate a PDF report for rice crop data based on year and location."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "year": {"type": "STRING", "description": "The sampled year (e.g., '2022', '2023')."},
                "location": {"type": "STRING", "description": "The name of the village or location."}
            },
            "required": ["year", "location"]
        })
    }

    async fn call(&self, args: &Value) -> Result<String, ToolError> {
        let year = string_arg(self.name(), args, "year")?;
        let location = string_arg(self.name(), args, "location")?;

        // Spreadsheet loading and PDF writing are blocking
        let generator = self.generator.clone();
        let result = tokio::task::spawn_blocking(move || generator.generate(&year, &location))
            .await
            .map_err(|e| ToolError::Task(e.to_string()))?;
        Ok(result?)
    }
}

/// The tools available to the agent, in declaration order
#[derive(Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.by_name.insert(tool.name().to_string(), self.tools.len());
        self.tools.push(tool);
        self
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// True when every tool reports healthy
    pub async fn health_check(&self) -> bool {
        for tool in &self.tools {
            if !tool.health_check().await {
                return false;
            }
        }
        true
    }

    /// Run a requested call; failures become the text returned to the model
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let result = match self.by_name.get(&call.name) {
            Some(&index) => self.tools[index].call(&call.args).await,
            None => Err(ToolError::UnknownTool(call.name.clone())),
        };

        let content = match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", call.name, e);
                e.to_string()
            }
        };

        ToolOutput {
            name: call.name.clone(),
            content,
        }
    }
}
