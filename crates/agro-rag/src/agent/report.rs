//! Rice crop PDF reports
//!
//! Filters the crop-record sheet by sampled year and village, then draws a
//! single letter-size page with a title, a summary line and a table.

use calamine::Data;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ReportConfig;
use crate::ingestion::{cell_text, FileParser};

/// Column holding the sampling year
pub const YEAR_COLUMN: &str = "Sampled Year";
/// Column holding the village name
pub const VILLAGE_COLUMN: &str = "Name of Village";
/// Columns shown in the report table, when present in the sheet
pub const REPORT_COLUMNS: &[&str] = &[
    "Name of Village",
    "Crop Name",
    "pH",
    "P",
    "K",
    "Fertilizer Used",
    "Yield Returns",
];

// Letter page, in points
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 50.0;
const FONT_SIZE: f32 = 8.0;
const HEADER_ROW_HEIGHT: f32 = 22.0;
const BODY_ROW_HEIGHT: f32 = 14.0;
const TABLE_TOP: f32 = 680.0;
/// Average Helvetica glyph width as a fraction of the font size
const GLYPH_WIDTH: f32 = 0.5;

/// Why a report was not produced. The display text is what the model sees.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("Error: Data file not found.")]
    DataFileNotFound,

    #[error("No data found for Year: {year} and Location: {location}.")]
    NoData { year: String, location: String },

    #[error("Error generating report: {0}")]
    Failed(String),
}

impl ReportError {
    fn failed(e: impl std::fmt::Display) -> Self {
        Self::Failed(e.to_string())
    }
}

/// How the requested year is compared with the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearFilter {
    /// Requested year parsed as an integer; numeric cells compare by value
    Numeric(i64),
    /// Requested year kept as text; compared with the cell text
    Text(String),
}

impl YearFilter {
    pub fn parse(year: &str) -> Self {
        match year.trim().parse::<i64>() {
            Ok(n) => Self::Numeric(n),
            Err(_) => Self::Text(year.to_string()),
        }
    }

    pub fn matches(&self, cell: &Data) -> bool {
        match self {
            Self::Numeric(year) => cell_year(cell) == Some(*year),
            Self::Text(year) => cell_text(cell).is_some_and(|text| text.trim() == year.trim()),
        }
    }
}

/// Integer value of a year cell, if it holds one
fn cell_year(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Data::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Crop-record sheet: header row plus data rows
#[derive(Debug, Clone, Default)]
pub struct CropTable {
    headers: Vec<String>,
    rows: Vec<Vec<Data>>,
}

impl CropTable {
    /// First row is the header
    pub fn from_rows(mut rows: Vec<Vec<Data>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let headers = rows
            .remove(0)
            .iter()
            .map(|cell| cell_text(cell).map(|h| h.trim().to_string()).unwrap_or_default())
            .collect();
        Self { headers, rows }
    }

    /// Load the first sheet of a workbook
    pub fn load(path: &Path) -> crate::Result<Self> {
        let sheet = FileParser::read_first_sheet(path)?;
        Ok(Self::from_rows(sheet.rows))
    }

    /// Index of a named column
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn required_column(&self, name: &str) -> Result<usize, ReportError> {
        self.column(name)
            .ok_or_else(|| ReportError::Failed(format!("Missing column '{}'", name)))
    }

    /// Rows for the year whose village contains `location`, ignoring case
    pub fn filter(&self, year: &YearFilter, location: &str) -> Result<Vec<&[Data]>, ReportError> {
        let year_col = self.required_column(YEAR_COLUMN)?;
        let village_col = self.required_column(VILLAGE_COLUMN)?;
        let needle = location.to_lowercase();

        Ok(self
            .rows
            .iter()
            .filter(|row| row.get(year_col).is_some_and(|cell| year.matches(cell)))
            .filter(|row| {
                row.get(village_col)
                    .and_then(cell_text)
                    .is_some_and(|village| village.to_lowercase().contains(&needle))
            })
            .map(|row| row.as_slice())
            .collect())
    }

    /// Table cells for the report columns present in this sheet
    fn report_table(&self, rows: &[&[Data]]) -> (Vec<String>, Vec<Vec<String>>) {
        let columns: Vec<(usize, &str)> = REPORT_COLUMNS
            .iter()
            .filter_map(|name| self.column(name).map(|i| (i, *name)))
            .collect();

        let header = columns.iter().map(|(_, name)| name.to_string()).collect();
        let body = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|(i, _)| row.get(*i).and_then(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();
        (header, body)
    }
}

/// Writes crop reports into the reports directory
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    data_path: PathBuf,
    output_dir: PathBuf,
    public_base_url: String,
}

impl ReportGenerator {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            data_path: config.data_path.clone(),
            output_dir: config.output_dir.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Load the crop sheet and generate the report
    pub fn generate(&self, year: &str, location: &str) -> Result<String, ReportError> {
        if !self.data_path.exists() {
            return Err(ReportError::DataFileNotFound);
        }
        let table = CropTable::load(&self.data_path).map_err(ReportError::failed)?;
        self.generate_from_table(&table, year, location)
    }

    /// Generate the report from an already loaded sheet
    pub fn generate_from_table(
        &self,
        table: &CropTable,
        year: &str,
        location: &str,
    ) -> Result<String, ReportError> {
        let rows = table.filter(&YearFilter::parse(year), location)?;
        if rows.is_empty() {
            return Err(ReportError::NoData {
                year: year.to_string(),
                location: location.to_string(),
            });
        }

        std::fs::create_dir_all(&self.output_dir).map_err(ReportError::failed)?;
        let filename = report_filename(year, location);
        let path = self.output_dir.join(&filename);

        let (header, body) = table.report_table(&rows);
        let mut doc = render_report(
            &format!("Rice Crop Report - {} ({})", location, year),
            &format!(
                "This report summarizes rice crop samples for {} in {}.",
                location, year
            ),
            &header,
            &body,
        )?;
        doc.save(&path).map_err(ReportError::failed)?;

        tracing::info!("Report written to {} ({} rows)", path.display(), body.len());

        Ok(format!(
            "Report generated successfully. You can download it here: [{}]({}/reports/{})",
            filename, self.public_base_url, filename
        ))
    }
}

/// `Rice_Crop_Report_{location}_{year}.pdf`, with path separators replaced
pub fn report_filename(year: &str, location: &str) -> String {
    let clean = |s: &str| s.replace(['/', '\\'], "_");
    format!("Rice_Crop_Report_{}_{}.pdf", clean(location), clean(year))
}

fn real(v: f32) -> Object {
    Object::Real(v.into())
}

/// Helvetica with WinAnsi encoding: map to Latin-1, `?` for the rest
fn pdf_text(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH
}

/// Cut text so it fits in `width` points
fn fit_text(text: &str, width: f32, size: f32) -> String {
    let max_chars = ((width / (size * GLYPH_WIDTH)).floor() as usize).max(1);
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars.saturating_sub(2)).collect();
        cut.push_str("..");
        cut
    }
}

fn fill_color(ops: &mut Vec<Operation>, (r, g, b): (f32, f32, f32)) {
    ops.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
}

fn text_at(ops: &mut Vec<Operation>, font: &str, size: f32, x: f32, y: f32, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), real(size)]));
    ops.push(Operation::new("Td", vec![real(x), real(y)]));
    ops.push(Operation::new("Tj", vec![pdf_text(text)]));
    ops.push(Operation::new("ET", vec![]));
}

const GREY: (f32, f32, f32) = (0.5, 0.5, 0.5);
const WHITESMOKE: (f32, f32, f32) = (0.961, 0.961, 0.961);
const BEIGE: (f32, f32, f32) = (0.961, 0.961, 0.863);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);

/// Build the single report page
fn render_report(
    title: &str,
    summary: &str,
    header: &[String],
    body: &[Vec<String>],
) -> Result<Document, ReportError> {
    let mut ops = Vec::new();

    // Title, centred
    let title_size = 18.0;
    let title_x = ((PAGE_WIDTH - text_width(title, title_size)) / 2.0).max(MARGIN);
    fill_color(&mut ops, BLACK);
    text_at(&mut ops, "F2", title_size, title_x, 740.0, title);
    text_at(&mut ops, "F1", 10.0, MARGIN, 710.0, summary);

    let columns = header.len().max(1);
    let table_width = PAGE_WIDTH - 2.0 * MARGIN;
    let col_width = table_width / columns as f32;

    let room = TABLE_TOP - HEADER_ROW_HEIGHT - (MARGIN + BODY_ROW_HEIGHT);
    let fits = ((room / BODY_ROW_HEIGHT).floor() as usize).min(body.len());
    let shown = &body[..fits];

    let header_bottom = TABLE_TOP - HEADER_ROW_HEIGHT;
    let table_bottom = header_bottom - shown.len() as f32 * BODY_ROW_HEIGHT;

    // Backgrounds
    fill_color(&mut ops, GREY);
    ops.push(Operation::new(
        "re",
        vec![real(MARGIN), real(header_bottom), real(table_width), real(HEADER_ROW_HEIGHT)],
    ));
    ops.push(Operation::new("f", vec![]));
    if !shown.is_empty() {
        fill_color(&mut ops, BEIGE);
        ops.push(Operation::new(
            "re",
            vec![
                real(MARGIN),
                real(table_bottom),
                real(table_width),
                real(header_bottom - table_bottom),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
    }

    // Grid
    ops.push(Operation::new("RG", vec![real(0.0), real(0.0), real(0.0)]));
    ops.push(Operation::new("w", vec![real(1.0)]));
    let mut row_top = TABLE_TOP;
    for height in std::iter::once(HEADER_ROW_HEIGHT).chain(shown.iter().map(|_| BODY_ROW_HEIGHT)) {
        for col in 0..columns {
            let x = MARGIN + col as f32 * col_width;
            ops.push(Operation::new(
                "re",
                vec![real(x), real(row_top - height), real(col_width), real(height)],
            ));
        }
        row_top -= height;
    }
    ops.push(Operation::new("S", vec![]));

    // Cell text, centred; header text sits above the extra bottom padding
    let cell_text_ops = |ops: &mut Vec<Operation>, font: &str, cells: &[String], baseline: f32| {
        for (col, cell) in cells.iter().enumerate().take(columns) {
            let text = fit_text(cell, col_width - 4.0, FONT_SIZE);
            let x = MARGIN + col as f32 * col_width + (col_width - text_width(&text, FONT_SIZE)) / 2.0;
            text_at(ops, font, FONT_SIZE, x, baseline, &text);
        }
    };

    fill_color(&mut ops, WHITESMOKE);
    cell_text_ops(&mut ops, "F2", header, header_bottom + 10.0);

    fill_color(&mut ops, BLACK);
    for (i, row) in shown.iter().enumerate() {
        let baseline = header_bottom - (i as f32 + 1.0) * BODY_ROW_HEIGHT + 4.0;
        cell_text_ops(&mut ops, "F1", row, baseline);
    }

    if body.len() > shown.len() {
        let note = format!("... and {} more rows", body.len() - shown.len());
        text_at(&mut ops, "F1", FONT_SIZE, MARGIN, table_bottom - 12.0, &note);
    }

    build_document(Content { operations: ops })
}

fn build_document(content: Content) -> Result<Document, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let encoded = content.encode().map_err(ReportError::failed)?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}
