//! agro-rag: agronomy assistant backend
//!
//! Ingests PDF pages and spreadsheet rows into a hosted vector store and
//! answers chat queries through a tool-using LLM agent. The agent can search
//! the ingested documents and render crop reports as downloadable PDFs.

pub mod agent;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod providers;
pub mod server;
pub mod types;

pub use agent::{Agent, SessionStore};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use ingestion::{IngestPipeline, IngestReport};
pub use server::RagServer;
pub use types::{AskRequest, AskResponse, ChatTurn, Chunk, Document, DocumentMetadata, FileType};
