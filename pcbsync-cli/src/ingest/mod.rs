//! Spreadsheet ingestion: workbook parsing and record extraction

pub mod record;
pub mod sheet;

pub use record::{ColumnMapping, ColumnRef, ExtractError, PcbRecord, ResolvedColumns, extract_record};
pub use sheet::{CellValue, Sheet, SheetError, SheetRow, read_sheet};
