//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::Chunk;

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk (without its embedding)
    pub chunk: Chunk,
    /// Similarity score, higher is more similar
    pub similarity: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `SupabaseVectorStore`: PostgREST table plus `match_documents` RPC
/// - `MemoryVectorStore`: in-process cosine search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Append embedded chunks. Existing rows are never updated.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Return the `top_k` entries closest to the query embedding
    async fn search(&self, query_embedding: &[f32], top_k: usize)
        -> Result<Vec<VectorSearchResult>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
