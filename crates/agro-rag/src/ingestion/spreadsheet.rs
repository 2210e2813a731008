//! Spreadsheet rows to documents
//!
//! Recommendation sheets carry a title block above the real header, so the
//! header row is searched for. Every other sheet uses its first row.

use calamine::Data;

use super::parser::{cell_text, SheetRows};
use crate::types::{Document, DocumentMetadata};

/// Header tokens that identify a recommendation-sheet header row
const HEADER_TOKENS: &[&str] = &["Disease Name", "Management"];

/// A row with at least this many filled cells is taken as the header
const MIN_HEADER_CELLS: usize = 4;

/// Result of searching a sheet for its header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDetection {
    /// Index into the sheet rows
    Found(usize),
    NotFound,
}

/// Find the first row that contains a known header token or has at least
/// four non-empty cells.
pub fn detect_header_row(rows: &[Vec<Data>]) -> HeaderDetection {
    rows.iter()
        .position(|row| {
            let cells: Vec<String> = row.iter().filter_map(cell_text).collect();
            let has_token = cells
                .iter()
                .any(|c| HEADER_TOKENS.iter().any(|token| c.contains(token)));
            has_token || cells.len() >= MIN_HEADER_CELLS
        })
        .map_or(HeaderDetection::NotFound, HeaderDetection::Found)
}

/// How a spreadsheet is turned into documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetPolicy {
    /// Header row located heuristically, labelled row documents
    Recommendation,
    /// First row is the header
    Standard,
}

impl SheetPolicy {
    /// Pick the policy from the file name
    pub fn for_filename(filename: &str, recommendation_pattern: &str) -> Self {
        if !recommendation_pattern.is_empty() && filename.contains(recommendation_pattern) {
            Self::Recommendation
        } else {
            Self::Standard
        }
    }
}

/// Outcome of normalizing one sheet
#[derive(Debug, Clone, PartialEq)]
pub enum SheetDocuments {
    Documents(Vec<Document>),
    /// The sheet was skipped; carries the reason for the log
    Skipped(String),
}

/// Turns sheet rows into `"{header}: {value}"` documents
pub struct SpreadsheetNormalizer {
    recommendation_pattern: String,
    recommendation_label: String,
}

impl SpreadsheetNormalizer {
    pub fn new(recommendation_pattern: impl Into<String>, recommendation_label: impl Into<String>) -> Self {
        Self {
            recommendation_pattern: recommendation_pattern.into(),
            recommendation_label: recommendation_label.into(),
        }
    }

    /// Policy used for a given file name
    pub fn policy_for(&self, filename: &str) -> SheetPolicy {
        SheetPolicy::for_filename(filename, &self.recommendation_pattern)
    }

    /// Normalize a sheet according to the file name's policy
    pub fn normalize(&self, filename: &str, sheet: &SheetRows) -> SheetDocuments {
        match self.policy_for(filename) {
            SheetPolicy::Recommendation => self.recommendation_documents(filename, sheet),
            SheetPolicy::Standard => SheetDocuments::Documents(standard_documents(filename, sheet)),
        }
    }

    fn recommendation_documents(&self, filename: &str, sheet: &SheetRows) -> SheetDocuments {
        if sheet.rows.is_empty() {
            return SheetDocuments::Skipped("sheet is empty".to_string());
        }

        let header_index = match detect_header_row(&sheet.rows) {
            HeaderDetection::Found(index) => index,
            HeaderDetection::NotFound => {
                return SheetDocuments::Skipped("could not find a likely header row".to_string())
            }
        };
        let headers = &sheet.rows[header_index];

        let documents = sheet
            .rows
            .iter()
            .enumerate()
            .skip(header_index + 1)
            .filter(|(_, row)| row.iter().any(|cell| cell_text(cell).is_some()))
            .filter_map(|(index, row)| {
                let lines = row_lines(headers, row, true);
                if lines.is_empty() {
                    return None;
                }
                let content = format!("{}\n{}", self.recommendation_label, lines.join("\n"));
                Some(Document::new(
                    content,
                    DocumentMetadata::sheet_row(filename, sheet.sheet_row(index)),
                ))
            })
            .collect();

        SheetDocuments::Documents(documents)
    }
}

impl Default for SpreadsheetNormalizer {
    fn default() -> Self {
        Self::new("RiceRecommendationData", "Rice Recommendation Data:")
    }
}

/// First row is the header; every later row with at least one value becomes
/// a document.
pub fn standard_documents(filename: &str, sheet: &SheetRows) -> Vec<Document> {
    let Some(headers) = sheet.rows.first() else {
        return Vec::new();
    };

    sheet
        .rows
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(index, row)| {
            let lines = row_lines(headers, row, false);
            if lines.is_empty() {
                return None;
            }
            Some(Document::new(
                lines.join("\n"),
                DocumentMetadata::sheet_row(filename, sheet.sheet_row(index)),
            ))
        })
        .collect()
}

/// `"{header}: {value}"` for each filled cell of a row
fn row_lines(headers: &[Data], row: &[Data], clean: bool) -> Vec<String> {
    row.iter()
        .enumerate()
        .filter_map(|(i, cell)| {
            let value = cell_text(cell)?;
            let header = headers
                .get(i)
                .and_then(cell_text)
                .map(|h| if clean { h.trim().replace('\n', " ") } else { h })
                .unwrap_or_else(|| format!("Column {}", i));
            let value = if clean { value.trim().to_string() } else { value };
            Some(format!("{}: {}", header, value))
        })
        .collect()
}
