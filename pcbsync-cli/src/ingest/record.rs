//! Mapping sheet rows to PCB records

use std::fmt;

use serde::Deserialize;

use super::sheet::{Sheet, SheetRow};

/// Reference to a spreadsheet column, by 0-based position or header name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl ColumnRef {
    /// Parse a CLI-supplied reference: integers become positions,
    /// anything else is a header name
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<usize>() {
            Ok(idx) => ColumnRef::Index(idx),
            Err(_) => ColumnRef::Name(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(idx) => write!(f, "column {}", idx),
            ColumnRef::Name(name) => write!(f, "column '{}'", name),
        }
    }
}

/// Which columns hold the two key fields
///
/// Defaults to the legacy export layout: serial in column 0, item in
/// column 2, column 1 unused.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub serial: ColumnRef,
    pub item: ColumnRef,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            serial: ColumnRef::Index(0),
            item: ColumnRef::Index(2),
        }
    }
}

impl ColumnMapping {
    /// Validate the mapping against a parsed header, once per sheet,
    /// before any row is extracted
    pub fn resolve(&self, sheet: &Sheet) -> Result<ResolvedColumns, ExtractError> {
        Ok(ResolvedColumns {
            serial: resolve_ref(&self.serial, sheet)?,
            item: resolve_ref(&self.item, sheet)?,
        })
    }
}

fn resolve_ref(column: &ColumnRef, sheet: &Sheet) -> Result<usize, ExtractError> {
    match column {
        ColumnRef::Index(idx) => {
            if *idx < sheet.columns.len() {
                Ok(*idx)
            } else {
                Err(ExtractError::ColumnOutOfRange {
                    index: *idx,
                    width: sheet.columns.len(),
                })
            }
        }
        ColumnRef::Name(name) => sheet
            .column_index(name)
            .ok_or_else(|| ExtractError::ColumnNotFound { name: name.clone() }),
    }
}

/// Header positions the two key fields resolved to
#[derive(Debug, Clone, Copy)]
pub struct ResolvedColumns {
    pub serial: usize,
    pub item: usize,
}

/// The domain entity: one (engineering serial, PCB item) pair
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PcbRecord {
    pub eng_sr: String,
    pub pcb_item: String,
}

/// Extraction failures
///
/// Mapping-resolution variants surface before any row is read and are
/// fatal for the file; `MissingField` is recorded per row.
#[derive(Debug)]
pub enum ExtractError {
    ColumnNotFound { name: String },
    ColumnOutOfRange { index: usize, width: usize },
    MissingField { field: &'static str, column: usize },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::ColumnNotFound { name } => {
                write!(f, "column '{}' not found in header", name)
            }
            ExtractError::ColumnOutOfRange { index, width } => write!(
                f,
                "column index {} is out of range for a {}-column sheet",
                index, width
            ),
            ExtractError::MissingField { field, column } => {
                write!(f, "{} is missing (column {})", field, column)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the key pair from a row
///
/// The serial is trimmed and upper-cased for matching; the item is taken
/// verbatim in its string form. Both fields must be populated.
pub fn extract_record(
    row: &SheetRow,
    columns: &ResolvedColumns,
) -> Result<PcbRecord, ExtractError> {
    let eng_sr = cell_string(row, columns.serial)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or(ExtractError::MissingField {
            field: "engineering serial",
            column: columns.serial,
        })?;

    let pcb_item = cell_string(row, columns.item)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ExtractError::MissingField {
            field: "PCB item",
            column: columns.item,
        })?;

    Ok(PcbRecord { eng_sr, pcb_item })
}

fn cell_string(row: &SheetRow, idx: usize) -> Option<String> {
    row.cell(idx).map(|c| c.to_display_string())
}
