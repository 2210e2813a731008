//! Document ingestion: PDF pages and spreadsheet rows into overlapping chunks

mod chunker;
#[cfg(test)]
pub(crate) mod fixtures;
mod parser;
mod processor;
pub mod spreadsheet;

pub use chunker::TextChunker;
pub use parser::{cell_text, FileParser, SheetRows};
pub use processor::{IngestPipeline, IngestReport, LoadedDocuments};
pub use spreadsheet::{
    detect_header_row, HeaderDetection, SheetDocuments, SheetPolicy, SpreadsheetNormalizer,
};
