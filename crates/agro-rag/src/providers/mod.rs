//! Provider abstractions for embeddings, the chat model and vector storage
//!
//! Hosted backends (Gemini, Supabase) sit behind traits so the agent and the
//! ingestion pipeline can run against in-process stand-ins.

pub mod embedding;
pub mod gemini;
pub mod llm;
pub mod local;
pub mod supabase;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use gemini::GeminiClient;
pub use llm::{ChatMessage, ChatRequest, LlmProvider, ModelReply, ToolCall, ToolOutput, ToolSpec};
pub use local::MemoryVectorStore;
pub use supabase::SupabaseVectorStore;
pub use vector_store::{VectorSearchResult, VectorStoreProvider};
