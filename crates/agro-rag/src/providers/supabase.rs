//! Supabase vector store over PostgREST
//!
//! Rows go into the `documents` table; similarity search runs through the
//! `match_documents` SQL function exposed as an RPC endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SupabaseConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, DocumentMetadata};

use super::vector_store::{VectorSearchResult, VectorStoreProvider};

/// Supabase (PostgREST) vector store
pub struct SupabaseVectorStore {
    client: reqwest::Client,
    rest_url: String,
    service_key: String,
    table: String,
    query_name: String,
    batch_size: usize,
}

impl SupabaseVectorStore {
    /// Create a new store from config
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::Config("SUPABASE_URL is not set".to_string()));
        }
        if config.service_key.trim().is_empty() {
            return Err(Error::Config("SUPABASE_SERVICE_KEY is not set".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            service_key: config.service_key.clone(),
            table: config.table.clone(),
            query_name: config.query_name.clone(),
            batch_size: config.upsert_batch_size.max(1),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::vector_db(format!("{} failed ({}): {}", action, status, body)))
    }
}

#[derive(Serialize)]
struct InsertRow<'a> {
    content: &'a str,
    metadata: &'a DocumentMetadata,
    embedding: &'a [f32],
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_count: usize,
    filter: serde_json::Value,
}

#[derive(Deserialize)]
struct MatchRow {
    content: String,
    #[serde(default)]
    metadata: Option<DocumentMetadata>,
    #[serde(default)]
    similarity: f32,
}

#[async_trait]
impl VectorStoreProvider for SupabaseVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        let url = format!("{}/{}", self.rest_url, self.table);

        for (i, batch) in chunks.chunks(self.batch_size).enumerate() {
            let rows: Vec<InsertRow<'_>> = batch
                .iter()
                .map(|c| InsertRow {
                    content: &c.content,
                    metadata: &c.metadata,
                    embedding: &c.embedding,
                })
                .collect();

            let response = self
                .authorized(self.client.post(&url))
                .header("Prefer", "return=minimal")
                .json(&rows)
                .send()
                .await
                .map_err(|e| Error::vector_db(format!("Insert request failed: {}", e)))?;
            Self::check(response, "Insert").await?;

            tracing::debug!("Inserted batch {} ({} rows) into {}", i + 1, batch.len(), self.table);
        }

        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let url = format!("{}/rpc/{}", self.rest_url, self.query_name);
        let request = MatchRequest {
            query_embedding,
            match_count: top_k,
            filter: serde_json::json!({}),
        };

        let response = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Search request failed: {}", e)))?;
        let response = Self::check(response, "Search").await?;

        let rows: Vec<MatchRow> = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse search response: {}", e)))?;

        Ok(rows
            .into_iter()
            .take(top_k)
            .map(|row| VectorSearchResult {
                chunk: Chunk::new(row.content, row.metadata.unwrap_or_default()),
                similarity: row.similarity,
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/{}", self.rest_url, self.table);
        let response = self
            .authorized(self.client.get(&url))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }

    fn name(&self) -> &str {
        "supabase"
    }
}
