//! In-process vector store
//!
//! Keeps embedded chunks in memory and ranks them by cosine similarity.
//! Used for local runs without a Supabase project and in tests.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::Chunk;

use super::vector_store::{VectorSearchResult, VectorStoreProvider};

/// Memory-backed vector store
#[derive(Default)]
pub struct MemoryVectorStore {
    entries: RwLock<Vec<Chunk>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create pre-filled with embedded chunks
    pub fn with_chunks(chunks: Vec<Chunk>) -> Self {
        Self {
            entries: RwLock::new(chunks),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl VectorStoreProvider for MemoryVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if let Some(chunk) = chunks.iter().find(|c| c.embedding.is_empty()) {
            return Err(Error::vector_db(format!(
                "Chunk from {} has no embedding",
                chunk.metadata.source
            )));
        }
        self.entries.write().extend_from_slice(chunks);
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let entries = self.entries.read();
        let mut scored: Vec<VectorSearchResult> = entries
            .iter()
            .map(|chunk| VectorSearchResult {
                similarity: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: Chunk::new(chunk.content.clone(), chunk.metadata.clone()),
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Cosine similarity; 0.0 when either vector is zero or lengths differ
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
