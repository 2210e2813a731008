//! Core types shared by ingestion, retrieval, the agent and the HTTP layer

pub mod chat;
pub mod document;
pub mod query;
pub mod response;

pub use chat::{ChatRole, ChatTurn};
pub use document::{Chunk, Document, DocumentMetadata, FileType};
pub use query::AskRequest;
pub use response::AskResponse;
