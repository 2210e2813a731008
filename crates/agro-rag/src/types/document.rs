//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};

/// Supported input file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// Anything else (ignored by ingestion)
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "xlsx" => Self::Xlsx,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name or path
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Self::Unknown,
        }
    }
}

/// Where a piece of text came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File path (PDFs) or file name (spreadsheets)
    #[serde(default)]
    pub source: String,
    /// 0-based PDF page index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// 1-based spreadsheet row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    /// Input file type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    /// Window index within the parent document (set by the splitter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
}

impl DocumentMetadata {
    /// Metadata for a PDF page
    pub fn pdf_page(source: impl Into<String>, page: u32) -> Self {
        Self {
            source: source.into(),
            page: Some(page),
            row: None,
            file_type: Some(FileType::Pdf),
            chunk_index: None,
        }
    }

    /// Metadata for a spreadsheet row
    pub fn sheet_row(source: impl Into<String>, row: u32) -> Self {
        Self {
            source: source.into(),
            page: None,
            row: Some(row),
            file_type: Some(FileType::Xlsx),
            chunk_index: None,
        }
    }

    /// Render as a JSON object string, used in retrieval output
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"source\":\"{}\"}}", self.source))
    }
}

/// A normalized document: one PDF page or one spreadsheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text content
    pub content: String,
    /// Source metadata
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a new document
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A bounded window of document text, ready for embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub content: String,
    /// Source metadata inherited from the parent document
    pub metadata: DocumentMetadata,
    /// Embedding vector (empty until embedded)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(content: String, metadata: DocumentMetadata) -> Self {
        Self {
            content,
            metadata,
            embedding: Vec::new(),
        }
    }

    /// Attach an embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}
