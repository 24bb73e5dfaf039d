//! First-sheet workbook parsing into typed rows
//!
//! Reads `.xls` and `.xlsx` files. Only the first worksheet is read; the
//! upstream process is expected to place the relevant data there. Row 0
//! supplies the column names.

use std::fmt;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};

/// A single cell, typed at the parsing boundary
///
/// Typing is positional per cell, not per column: two rows may hold
/// different kinds of values under the same header if the source mixes
/// types.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// String form used for field extraction; whole numbers render
    /// without a trailing `.0`
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Number(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 =>
            {
                (*f as i64).to_string()
            }
            CellValue::Number(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

/// One data row; cells are positional, padded to the header width
#[derive(Debug, Clone, Default)]
pub struct SheetRow {
    cells: Vec<Option<CellValue>>,
}

impl SheetRow {
    pub(crate) fn from_cells(cells: Vec<Option<CellValue>>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, idx: usize) -> Option<&CellValue> {
        self.cells.get(idx).and_then(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_none())
    }
}

/// First worksheet of a workbook: header names plus data rows
#[derive(Debug, Clone)]
pub struct Sheet {
    pub columns: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl Sheet {
    /// Case-insensitive header lookup
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let needle = name.trim().to_lowercase();
        self.columns
            .iter()
            .position(|c| c.trim().to_lowercase() == needle)
    }
}

/// Errors raised while opening or parsing a workbook; all are fatal for
/// the file they occurred in, never for the batch
#[derive(Debug)]
pub enum SheetError {
    /// The path does not exist
    FileNotFound(PathBuf),
    /// The extension is neither `.xls` nor `.xlsx`
    UnsupportedFormat(PathBuf),
    /// The workbook could not be parsed: unreadable, no sheets, or a
    /// missing/blank header
    Parse(String),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::FileNotFound(path) => write!(f, "file not found: {}", path.display()),
            SheetError::UnsupportedFormat(path) => {
                write!(f, "unsupported spreadsheet format: {}", path.display())
            }
            SheetError::Parse(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SheetError {}

/// Read the first worksheet of an `.xls`/`.xlsx` workbook
///
/// Every header cell must be populated. A completely empty data row
/// produces no output row; a row with empty trailing cells is kept with
/// those cells unset.
pub fn read_sheet(path: &Path) -> Result<Sheet, SheetError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if !matches!(ext.as_deref(), Some("xls") | Some("xlsx")) {
        return Err(SheetError::UnsupportedFormat(path.to_path_buf()));
    }
    if !path.exists() {
        return Err(SheetError::FileNotFound(path.to_path_buf()));
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| {
        SheetError::Parse(format!("failed to open workbook {}: {}", path.display(), e))
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .ok_or_else(|| SheetError::Parse(format!("workbook {} has no sheets", path.display())))?
        .clone();

    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        SheetError::Parse(format!("failed to read sheet '{}': {}", sheet_name, e))
    })?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| {
        SheetError::Parse(format!("workbook {} has no header row", path.display()))
    })?;

    let mut columns = Vec::with_capacity(header.len());
    for (idx, cell) in header.iter().enumerate() {
        let name = cell.to_string().trim().to_string();
        if name.is_empty() {
            return Err(SheetError::Parse(format!(
                "header cell {} of sheet '{}' is empty",
                idx, sheet_name
            )));
        }
        columns.push(name);
    }

    // Data rows wider than the header are truncated to it, matching the
    // header-driven column count.
    let width = columns.len();
    let mut data_rows = Vec::new();
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut cells: Vec<Option<CellValue>> = row.iter().take(width).map(cell_value).collect();
        cells.resize(width, None);
        data_rows.push(SheetRow::from_cells(cells));
    }

    Ok(Sheet {
        columns,
        rows: data_rows,
    })
}

/// Numeric cells become `Number` (dates included, which the formats store
/// as serial numbers); everything else becomes its string form
fn cell_value(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty => None,
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Bool(b) => Some(CellValue::Text(b.to_string())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
        Data::Error(e) => Some(CellValue::Text(e.to_string())),
    }
}
