//! Ingestion pipeline orchestration

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{Chunk, Document, FileType};

use super::chunker::TextChunker;
use super::parser::FileParser;
use super::spreadsheet::{SheetDocuments, SpreadsheetNormalizer};

/// Counts collected over one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub pdf_files: usize,
    pub pdf_pages: usize,
    pub spreadsheets_loaded: usize,
    pub spreadsheets_skipped: usize,
    pub documents: usize,
    pub chunks: usize,
    pub uploaded: usize,
}

impl IngestReport {
    /// Emit the run summary
    pub fn log_summary(&self) {
        tracing::info!(
            pdf_files = self.pdf_files,
            pdf_pages = self.pdf_pages,
            spreadsheets_loaded = self.spreadsheets_loaded,
            spreadsheets_skipped = self.spreadsheets_skipped,
            documents = self.documents,
            chunks = self.chunks,
            uploaded = self.uploaded,
            "Ingestion summary"
        );
    }
}

/// Documents loaded from a directory, before chunking
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    pub report: IngestReport,
}

/// Main ingestion pipeline: directory to documents to chunks to vector store
pub struct IngestPipeline {
    chunker: TextChunker,
    normalizer: SpreadsheetNormalizer,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(chunker: TextChunker, normalizer: SpreadsheetNormalizer) -> Self {
        Self { chunker, normalizer }
    }

    /// Build from the chunking and ingestion config sections
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(
            TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
            SpreadsheetNormalizer::new(
                config.ingestion.recommendation_pattern.clone(),
                config.ingestion.recommendation_label.clone(),
            ),
        )
    }

    /// Load every PDF and spreadsheet at the top level of `dir`.
    ///
    /// PDFs come first, then spreadsheets, each sorted by file name. An
    /// unreadable PDF aborts the run; a bad spreadsheet is logged and skipped.
    pub fn load_directory(&self, dir: &Path) -> Result<LoadedDocuments> {
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "Documents directory not found: {}",
                dir.display()
            )));
        }

        let (pdfs, sheets) = list_inputs(dir)?;
        tracing::info!(
            "Found {} PDF(s) and {} spreadsheet(s) in {}",
            pdfs.len(),
            sheets.len(),
            dir.display()
        );

        let mut loaded = LoadedDocuments::default();

        for path in &pdfs {
            let pages = FileParser::parse_pdf(path)?;
            tracing::debug!("Loaded {} page(s) from {}", pages.len(), path.display());
            loaded.report.pdf_files += 1;
            loaded.report.pdf_pages += pages.len();
            loaded.documents.extend(pages);
        }

        for path in &sheets {
            match self.load_spreadsheet(path) {
                Ok(SheetDocuments::Documents(docs)) => {
                    tracing::debug!("Loaded {} row document(s) from {}", docs.len(), path.display());
                    loaded.report.spreadsheets_loaded += 1;
                    loaded.documents.extend(docs);
                }
                Ok(SheetDocuments::Skipped(reason)) => {
                    tracing::warn!("Skipping {}: {}", path.display(), reason);
                    loaded.report.spreadsheets_skipped += 1;
                }
                Err(e) => {
                    tracing::error!("Error loading {}: {}", path.display(), e);
                    loaded.report.spreadsheets_skipped += 1;
                }
            }
        }

        loaded.report.documents = loaded.documents.len();
        Ok(loaded)
    }

    /// Normalize the first sheet of one workbook
    pub fn load_spreadsheet(&self, path: &Path) -> Result<SheetDocuments> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let sheet = FileParser::read_first_sheet(path)?;
        Ok(self.normalizer.normalize(&filename, &sheet))
    }

    /// Split documents into overlapping windows
    pub fn chunk(&self, documents: &[Document]) -> Vec<Chunk> {
        self.chunker.chunk_documents(documents)
    }

    /// Load and chunk a directory; nothing leaves the process
    pub fn prepare(&self, dir: &Path) -> Result<(Vec<Chunk>, IngestReport)> {
        let LoadedDocuments { documents, mut report } = self.load_directory(dir)?;
        let chunks = self.chunk(&documents);
        report.chunks = chunks.len();
        Ok((chunks, report))
    }

    /// Embed chunks in batches and write them to the store.
    ///
    /// `on_batch` receives the number of chunks stored by each batch. A
    /// failed batch stops the run; earlier batches stay in the store.
    pub async fn embed_and_store(
        &self,
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        store: &dyn VectorStoreProvider,
        batch_size: usize,
        mut on_batch: impl FnMut(usize),
    ) -> Result<usize> {
        let batch_size = batch_size.max(1);
        let mut stored = 0;
        let mut chunks = chunks.into_iter().peekable();

        while chunks.peek().is_some() {
            let batch: Vec<Chunk> = chunks.by_ref().take(batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let embeddings = embedder.embed_documents(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let batch: Vec<Chunk> = batch
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| chunk.with_embedding(embedding))
                .collect();

            store.upsert(&batch).await?;
            stored += batch.len();
            on_batch(batch.len());
        }

        Ok(stored)
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(TextChunker::default(), SpreadsheetNormalizer::default())
    }
}

/// Top-level PDFs and spreadsheets in `dir`, each list sorted by name
fn list_inputs(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut pdfs = Vec::new();
    let mut sheets = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to read {}: {}", dir.display(), e),
            ))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        // Office lock files
        if name.starts_with("~$") {
            continue;
        }
        match FileType::from_filename(&name) {
            FileType::Pdf => pdfs.push(entry.into_path()),
            FileType::Xlsx => sheets.push(entry.into_path()),
            FileType::Unknown => {}
        }
    }

    Ok((pdfs, sheets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::local::MemoryVectorStore;
    use async_trait::async_trait;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "length"
        }
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let pipeline = IngestPipeline::default();
        let result = pipeline.load_directory(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_spreadsheet_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.xlsx"), b"not a workbook").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let loaded = IngestPipeline::default().load_directory(dir.path()).unwrap();
        assert!(loaded.documents.is_empty());
        assert_eq!(loaded.report.spreadsheets_skipped, 1);
        assert_eq!(loaded.report.spreadsheets_loaded, 0);
    }

    #[test]
    fn test_bad_pdf_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"not a pdf").unwrap();

        let result = IngestPipeline::default().load_directory(dir.path());
        assert!(matches!(result, Err(Error::FileParse { .. })));
    }

    #[test]
    fn test_list_inputs_sorted_top_level_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.pdf", "z.xlsx", "c.XLSX", "~$c.xlsx", "readme.md"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("deep.pdf"), b"").unwrap();

        let (pdfs, sheets) = list_inputs(dir.path()).unwrap();
        let names = |paths: &[PathBuf]| {
            paths
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&pdfs), vec!["a.pdf", "b.pdf"]);
        assert_eq!(names(&sheets), vec!["c.XLSX", "z.xlsx"]);
    }

    #[tokio::test]
    async fn test_embed_and_store_in_batches() {
        let pipeline = IngestPipeline::new(TextChunker::new(40, 0), SpreadsheetNormalizer::default());
        let docs = vec![
            Document::new(
                "Blast: spray tricyclazole.\n\nSheath blight: spray hexaconazole.",
                crate::types::DocumentMetadata::pdf_page("documents/rice.pdf", 0),
            ),
            Document::new(
                "Name of Village: Kottur",
                crate::types::DocumentMetadata::sheet_row("Cleaned_Data.xlsx", 2),
            ),
        ];
        let chunks = pipeline.chunk(&docs);
        assert_eq!(chunks.len(), 3);

        let store = MemoryVectorStore::new();
        let mut batches = Vec::new();
        let stored = pipeline
            .embed_and_store(chunks, &LengthEmbedder, &store, 2, |n| batches.push(n))
            .await
            .unwrap();

        assert_eq!(stored, 3);
        assert_eq!(batches, vec![2, 1]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_load_directory_reads_workbooks() {
        use crate::ingestion::fixtures::{n, t, write_xlsx, Cell};

        let dir = tempfile::tempdir().unwrap();
        write_xlsx(
            &dir.path().join("RiceRecommendationData.xlsx"),
            &[
                vec![t("Rice Recommendations 2023")],
                vec![],
                vec![t("Disease Name"), t("Symptoms"), t("Management")],
                vec![t("Blast"), t("Spindle lesions"), t("Tricyclazole 0.6 g/l")],
                vec![Cell::Blank, Cell::Blank, Cell::Blank],
                vec![t("Sheath blight"), Cell::Blank, t("Hexaconazole")],
            ],
        );
        write_xlsx(
            &dir.path().join("Cleaned_Data.xlsx"),
            &[
                vec![t("Sampled Year"), t("Name of Village"), t("pH")],
                vec![n(2022.0), t("Kottur"), n(6.5)],
            ],
        );

        let loaded = IngestPipeline::default().load_directory(dir.path()).unwrap();
        assert_eq!(loaded.report.spreadsheets_loaded, 2);
        assert_eq!(loaded.report.spreadsheets_skipped, 0);

        let docs = &loaded.documents;
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].metadata.source, "Cleaned_Data.xlsx");
        assert_eq!(docs[0].metadata.row, Some(2));
        assert_eq!(docs[0].content, "Sampled Year: 2022\nName of Village: Kottur\npH: 6.5");

        assert_eq!(docs[1].metadata.source, "RiceRecommendationData.xlsx");
        assert_eq!(docs[1].metadata.row, Some(4));
        assert_eq!(
            docs[1].content,
            "Rice Recommendation Data:\nDisease Name: Blast\nSymptoms: Spindle lesions\nManagement: Tricyclazole 0.6 g/l"
        );
        assert_eq!(docs[2].metadata.row, Some(6));
    }
}
