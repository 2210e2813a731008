//! PDF and spreadsheet readers

use calamine::{Data, Reader};
use lopdf::Object;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Document, DocumentMetadata};

/// `TJ` offset (thousandths of an em) treated as a word gap
const KERNING_SPACE: i64 = 200;

/// Rows of the first worksheet, as calamine cells
#[derive(Debug, Clone, Default)]
pub struct SheetRows {
    /// Cell rows, starting at the first used row of the sheet
    pub rows: Vec<Vec<Data>>,
    /// 1-based sheet row number of `rows[0]`
    pub first_row: u32,
}

impl SheetRows {
    /// Build from in-memory rows starting at sheet row 1
    pub fn from_rows(rows: Vec<Vec<Data>>) -> Self {
        Self { rows, first_row: 1 }
    }

    /// 1-based sheet row number for an index into `rows`
    pub fn sheet_row(&self, index: usize) -> u32 {
        self.first_row + index as u32
    }
}

/// File readers for the ingestion inputs
pub struct FileParser;

impl FileParser {
    /// Load a PDF page by page. Pages without text are dropped.
    pub fn parse_pdf(path: &Path) -> Result<Vec<Document>> {
        let source = path.display().to_string();
        let data = std::fs::read(path)?;
        Self::parse_pdf_bytes(&source, &data)
    }

    /// Load PDF bytes page by page, tagging each page with `source`
    pub fn parse_pdf_bytes(source: &str, data: &[u8]) -> Result<Vec<Document>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(source, format!("Failed to load PDF: {}", e)))?;

        let mut documents = Vec::new();
        for (page_num, page_id) in doc.get_pages() {
            let raw = match doc.extract_text(&[page_num]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("extract_text failed on {} page {}: {}, using content stream", source, page_num, e);
                    match doc.get_page_content(page_id) {
                        Ok(content) => Self::extract_text_from_content(&content),
                        Err(e) => {
                            tracing::debug!("Could not get content for page {}: {}", page_num, e);
                            continue;
                        }
                    }
                }
            };

            let content = cleanup_pdf_text(&raw);
            if content.trim().is_empty() {
                continue;
            }

            documents.push(Document::new(
                content,
                DocumentMetadata::pdf_page(source, page_num.saturating_sub(1)),
            ));
        }

        Ok(documents)
    }

    /// Text shown by a page content stream, one line per text object.
    ///
    /// Used when lopdf cannot map the page fonts. String bytes are taken as
    /// UTF-8; a wide negative kerning step inside `TJ` is read as a space.
    fn extract_text_from_content(content: &[u8]) -> String {
        let operations = match lopdf::content::Content::decode(content) {
            Ok(decoded) => decoded.operations,
            Err(e) => {
                tracing::debug!("Could not decode content stream: {}", e);
                return String::new();
            }
        };

        let mut text = String::new();
        let mut line = String::new();
        for op in operations {
            match op.operator.as_str() {
                "Tj" | "'" | "\"" => {
                    if let Some(Object::String(bytes, _)) = op.operands.last() {
                        line.push_str(&String::from_utf8_lossy(bytes));
                    }
                }
                "TJ" => {
                    for item in op.operands.iter().filter_map(|o| o.as_array().ok()).flatten() {
                        match item {
                            Object::String(bytes, _) => line.push_str(&String::from_utf8_lossy(bytes)),
                            Object::Integer(i) if *i <= -KERNING_SPACE => line.push(' '),
                            Object::Real(r) if f64::from(*r) <= -(KERNING_SPACE as f64) => line.push(' '),
                            _ => {}
                        }
                    }
                }
                "ET" if !line.is_empty() => {
                    text.push_str(&line);
                    text.push('\n');
                    line.clear();
                }
                _ => {}
            }
        }

        text
    }

    /// Read the first (active) worksheet of an xlsx file
    pub fn read_first_sheet(path: &Path) -> Result<SheetRows> {
        let filename = path.display().to_string();
        let mut workbook = calamine::open_workbook_auto(path)
            .map_err(|e| Error::file_parse(&filename, e.to_string()))?;

        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| Error::file_parse(&filename, e.to_string()))?,
            None => return Ok(SheetRows::default()),
        };

        let first_row = range.start().map(|(row, _)| row + 1).unwrap_or(1);
        let rows = range.rows().map(|row| row.to_vec()).collect();

        Ok(SheetRows { rows, first_row })
    }
}

/// Text of a cell, `None` for empty or blank cells
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extracted PDF text with NULs removed; line and paragraph breaks are kept
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String("  ".into())), None);
        assert_eq!(cell_text(&Data::String("Kottur".into())), Some("Kottur".into()));
        assert_eq!(cell_text(&Data::Float(2022.0)), Some("2022".into()));
        assert_eq!(cell_text(&Data::Float(6.5)), Some("6.5".into()));
        assert_eq!(cell_text(&Data::Int(42)), Some("42".into()));
    }

    #[test]
    fn test_cleanup_keeps_paragraph_breaks() {
        let cleaned = cleanup_pdf_text("Rice\0 blast\n\n  Management: spray\ntricyclazole\n");
        assert_eq!(cleaned, "Rice blast\n\n  Management: spray\ntricyclazole\n");
    }

    #[test]
    fn test_content_stream_fallback() {
        let stream = b"BT\n/F1 12 Tf\n(Zinc deficiency) Tj\nET\nBT\n(Apply ZnSO4) Tj\nET\n";
        let text = FileParser::extract_text_from_content(stream);
        assert_eq!(text, "Zinc deficiency\nApply ZnSO4\n");
    }

    #[test]
    fn test_content_stream_kerned_array() {
        let stream = b"BT\n[(Rice) -300 (blast) 20 (!)] TJ\nET\n";
        let text = FileParser::extract_text_from_content(stream);
        assert_eq!(text, "Rice blast!\n");
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        let err = FileParser::parse_pdf_bytes("broken.pdf", b"not a pdf").unwrap_err();
        assert!(err.to_string().contains("broken.pdf"));
    }

    #[test]
    fn test_read_first_sheet() {
        use crate::ingestion::fixtures::{n, t, write_xlsx, Cell};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Cleaned_Data.xlsx");
        write_xlsx(
            &path,
            &[
                vec![t("Name of Village"), t("Sampled Year")],
                vec![t("Kottur & Co"), n(2022.0)],
                vec![Cell::Blank, n(6.5)],
            ],
        );

        let sheet = FileParser::read_first_sheet(&path).unwrap();
        assert_eq!(sheet.first_row, 1);
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(cell_text(&sheet.rows[1][0]), Some("Kottur & Co".into()));
        assert_eq!(sheet.rows[1][1], Data::Float(2022.0));
        assert_eq!(sheet.rows[2][0], Data::Empty);
    }

    #[test]
    fn test_sheet_row_numbers() {
        let sheet = SheetRows {
            rows: vec![vec![Data::Empty]; 3],
            first_row: 4,
        };
        assert_eq!(sheet.sheet_row(0), 4);
        assert_eq!(sheet.sheet_row(2), 6);
    }
}
