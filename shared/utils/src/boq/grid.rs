//! Worksheet Grid Loader
//!
//! Turns a spreadsheet into a rectangular grid of typed cells. Supports
//! Excel (XLSX/XLSM/XLS) and CSV.

use calamine::{open_workbook_from_rs, DataType, Range, Reader, Xls, Xlsx};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

use crate::config::ImportConfig;
use crate::error::{SpkError, SpkResult};
use crate::validation::{validate_file_size, validate_file_type};

/// A single worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Spreadsheet day-count serial from a date-formatted cell.
    DateSerial(f64),
    Empty,
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Trimmed, non-empty text content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    /// Numeric value. Text is parsed leniently (thousand separators,
    /// currency prefixes); date serials are not numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text that ends with a separator, e.g. `"Tanggal:"`.
    pub fn is_label(&self) -> bool {
        self.as_text().map(|t| t.ends_with(':')).unwrap_or(false)
    }

    /// A cell that only holds separator characters, e.g. `":"`.
    pub fn is_separator(&self) -> bool {
        self.as_text()
            .map(|t| t.chars().all(|c| c == ':' || c == '=' || c == '-'))
            .unwrap_or(false)
    }

    /// Human readable rendering; whole numbers print without a fraction.
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) | Self::DateSerial(n) => format_number(*n),
            Self::Empty => String::new(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Lenient numeric parse for text cells: `"1,250.50"`, `"Rp 50,000"`,
/// `"Rp 50.000"`, `"12,5"`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let mut rupiah = false;
    for prefix in ["Rp.", "Rp", "IDR", "$"] {
        if s.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)) {
            s = s[prefix.len()..].to_string();
            rupiah = prefix != "$";
            break;
        }
    }
    if s.is_empty() {
        return None;
    }

    let commas = s.matches(',').count();
    let dots = s.matches('.').count();
    let normalized = match (commas, dots) {
        (0, _) if dots > 1 => s.replace('.', ""),
        (0, 1) if rupiah || is_thousands_group(&s, '.') => s.replace('.', ""),
        (0, _) => s,
        (_, 0) => {
            let decimals = s.rsplit(',').next().map(str::len).unwrap_or(0);
            if commas == 1 && decimals <= 2 {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        _ => {
            // The right-most separator is the decimal point.
            let last_comma = s.rfind(',').unwrap_or(0);
            let last_dot = s.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `"50.000"`: a lone separator followed by exactly three digits, with a
/// non-zero integer part.
fn is_thousands_group(s: &str, separator: char) -> bool {
    let Some((whole, group)) = s.split_once(separator) else {
        return false;
    };
    let whole = whole.trim_start_matches('-');
    group.len() == 3
        && group.chars().all(|c| c.is_ascii_digit())
        && !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && !whole.trim_start_matches('0').is_empty()
}

impl From<&DataType> for Cell {
    fn from(value: &DataType) -> Self {
        match value {
            DataType::String(s) => Cell::Text(s.clone()),
            DataType::Int(i) => Cell::Number(*i as f64),
            DataType::Float(f) => Cell::Number(*f),
            DataType::DateTime(serial) => Cell::DateSerial(*serial),
            DataType::DateTimeIso(s) => Cell::Text(s.clone()),
            DataType::Bool(b) => Cell::Text(b.to_string()),
            _ => Cell::Empty,
        }
    }
}

/// Rectangular cell grid; out-of-range lookups yield `Cell::Empty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl Grid {
    pub fn from_rows(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Self { rows, width }
    }

    pub fn from_range(range: &Range<DataType>) -> Self {
        let rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();
        Self::from_rows(rows)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows.iter().enumerate().map(|(i, r)| (i, r.as_slice()))
    }

    /// Row-major positions of every cell.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height()).flat_map(move |r| (0..self.width).map(move |c| (r, c)))
    }
}

/// Supported spreadsheet formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xlsx,
    Xls,
    Csv,
}

impl SpreadsheetFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Loads the BOQ worksheet of an uploaded file into a [`Grid`].
pub struct GridLoader<'a> {
    config: &'a ImportConfig,
}

impl<'a> GridLoader<'a> {
    pub fn new(config: &'a ImportConfig) -> Self {
        Self { config }
    }

    pub fn load_path(&self, path: &Path) -> SpkResult<Grid> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        validate_file_type(&filename, &self.config.allowed_extensions)?;
        if !path.is_file() {
            return Err(SpkError::not_found(path.display().to_string()));
        }

        let size = std::fs::metadata(path)?.len();
        validate_file_size(size, self.config.max_file_size)?;

        let data = std::fs::read(path)?;
        self.load_bytes(&filename, &data)
    }

    pub fn load_bytes(&self, filename: &str, data: &[u8]) -> SpkResult<Grid> {
        validate_file_type(filename, &self.config.allowed_extensions)?;
        validate_file_size(data.len() as u64, self.config.max_file_size)?;

        let format = SpreadsheetFormat::from_extension(Path::new(filename)).ok_or_else(|| {
            SpkError::validation("file_type", format!("Unsupported spreadsheet: {}", filename))
        })?;

        let grid = match format {
            SpreadsheetFormat::Xlsx => {
                let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data))
                    .map_err(|e| SpkError::spreadsheet(format!("Failed to open workbook: {}", e)))?;
                Grid::from_range(&self.select_sheet(workbook)?)
            }
            SpreadsheetFormat::Xls => {
                let workbook: Xls<_> = open_workbook_from_rs(Cursor::new(data))
                    .map_err(|e| SpkError::spreadsheet(format!("Failed to open workbook: {}", e)))?;
                Grid::from_range(&self.select_sheet(workbook)?)
            }
            SpreadsheetFormat::Csv => parse_csv(data)?,
        };

        debug!(
            filename,
            rows = grid.height(),
            cols = grid.width(),
            "Loaded worksheet grid"
        );
        Ok(grid)
    }

    fn select_sheet<RS, R>(&self, mut workbook: R) -> SpkResult<Range<DataType>>
    where
        RS: Read + Seek,
        R: Reader<RS>,
        R::Error: std::fmt::Display,
    {
        let wanted = self.config.sheet_name.trim();
        let names = workbook.sheet_names().to_vec();
        let sheet = names
            .iter()
            .find(|name| name.trim().eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| {
                SpkError::spreadsheet(format!(
                    "Worksheet '{}' not found (available: {})",
                    wanted,
                    names.join(", ")
                ))
            })?;

        workbook
            .worksheet_range(&sheet)
            .ok_or_else(|| SpkError::spreadsheet(format!("Worksheet '{}' is unreadable", sheet)))?
            .map_err(|e| SpkError::spreadsheet(format!("Failed to read worksheet '{}': {}", sheet, e)))
    }
}

fn parse_csv(data: &[u8]) -> SpkResult<Grid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                let trimmed = field.trim();
                if trimmed.is_empty() {
                    Cell::Empty
                } else if let Ok(n) = trimmed.parse::<f64>() {
                    Cell::Number(n)
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(Grid::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_format_detection() {
        assert_eq!(SpreadsheetFormat::from_extension(Path::new("a.xlsx")), Some(SpreadsheetFormat::Xlsx));
        assert_eq!(SpreadsheetFormat::from_extension(Path::new("a.XLS")), Some(SpreadsheetFormat::Xls));
        assert_eq!(SpreadsheetFormat::from_extension(Path::new("a.csv")), Some(SpreadsheetFormat::Csv));
        assert_eq!(SpreadsheetFormat::from_extension(Path::new("a.pdf")), None);
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("50000"), Some(50_000.0));
        assert_eq!(parse_number("1,250.50"), Some(1_250.5));
        assert_eq!(parse_number("1.250,50"), Some(1_250.5));
        assert_eq!(parse_number("Rp 50,000"), Some(50_000.0));
        assert_eq!(parse_number("Rp. 1.500.000"), Some(1_500_000.0));
        assert_eq!(parse_number("Rp 50.000"), Some(50_000.0));
        assert_eq!(parse_number("IDR 60.000"), Some(60_000.0));
        assert_eq!(parse_number("50.000"), Some(50_000.0));
        assert_eq!(parse_number("0.125"), Some(0.125));
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number("$ 12.50"), Some(12.5));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("m3"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_grid_is_rectangular() {
        let grid = Grid::from_rows(vec![
            vec![Cell::text("a")],
            vec![Cell::text("b"), Cell::Number(1.0), Cell::Number(2.0)],
        ]);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(0, 2), &Cell::Empty);
        assert_eq!(grid.cell(10, 10), &Cell::Empty);
    }

    #[test]
    fn test_cell_helpers() {
        assert!(Cell::text("Tanggal:").is_label());
        assert!(Cell::text(" : ").is_separator());
        assert!(!Cell::text("SPK").is_separator());
        assert!(Cell::text("   ").is_blank());
        assert_eq!(Cell::Number(123.0).display(), "123");
        assert_eq!(Cell::Number(1.5).display(), "1.5");
    }

    #[test]
    fn test_csv_loading() {
        let config = ImportConfig::default();
        let data = b"No. SPK,SPK-01\nDescription,Unit,Total Price\nExcavate,m3,100\n";
        let grid = GridLoader::new(&config).load_bytes("boq.csv", data).unwrap();

        assert_eq!(grid.height(), 3);
        assert_eq!(grid.cell(2, 2), &Cell::Number(100.0));
        assert_eq!(grid.cell(0, 1).as_text(), Some("SPK-01"));
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        let config = ImportConfig::default();
        let err = GridLoader::new(&config).load_bytes("boq.pdf", b"").unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let config = ImportConfig::default();
        let err = GridLoader::new(&config)
            .load_path(Path::new("/nonexistent/spk-boq.xlsx"))
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_xlsx_loading_selects_boq_sheet() {
        let mut workbook = Workbook::new();
        let cover = workbook.add_worksheet();
        cover.set_name("Cover").unwrap();
        cover.write_string(0, 0, "not this one").unwrap();

        let boq = workbook.add_worksheet();
        boq.set_name("boq").unwrap();
        boq.write_string(0, 0, "Description").unwrap();
        boq.write_number(1, 1, 42.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let config = ImportConfig::default();
        let grid = GridLoader::new(&config).load_bytes("order.xlsx", &bytes).unwrap();

        assert_eq!(grid.cell(0, 0).as_text(), Some("Description"));
        assert_eq!(grid.cell(1, 1), &Cell::Number(42.0));
    }

    #[test]
    fn test_xlsx_missing_sheet_is_fatal() {
        let mut workbook = Workbook::new();
        workbook.add_worksheet().set_name("Sheet1").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let config = ImportConfig::default();
        let err = GridLoader::new(&config).load_bytes("order.xlsx", &bytes).unwrap_err();
        assert_eq!(err.error_code(), "SPREADSHEET_ERROR");
    }
}
