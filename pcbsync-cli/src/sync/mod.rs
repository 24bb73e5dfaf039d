//! Batch reconciliation: files, then rows, strictly in order
//!
//! A row that fails extraction or storage is recorded and passed over; a
//! file that cannot be parsed at all is recorded and the batch moves on.
//! Nothing short of a configuration fault stops the run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ingest::{self, ColumnMapping, PcbRecord};
use crate::store::PcbStore;

/// Per-record result of the reconciliation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// New (serial, item) pair appended
    Inserted { row: usize, record: PcbRecord },
    /// Known serial rewritten with the incoming item
    Updated {
        row: usize,
        record: PcbRecord,
        rows_affected: u64,
    },
    /// The exact pair was already stored; nothing written
    Skipped { row: usize, record: PcbRecord },
    /// Extraction or store failure; the row was passed over
    Failed { row: usize, reason: String },
}

/// Everything that happened to a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcomes: Vec<SyncOutcome>,
    /// Set when the file could not be parsed at all; no outcomes then
    pub error: Option<String>,
}

/// Aggregated result of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Inserted { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Updated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Skipped { .. }))
    }

    pub fn failed_rows(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Failed { .. }))
    }

    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }

    fn count(&self, pred: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.files
            .iter()
            .flat_map(|f| f.outcomes.iter())
            .filter(|o| pred(o))
            .count()
    }
}

/// Sequential reconciliation of spreadsheet files against the store
pub struct SyncRunner {
    store: PcbStore,
    columns: ColumnMapping,
}

impl SyncRunner {
    pub fn new(store: PcbStore, columns: ColumnMapping) -> Self {
        Self { store, columns }
    }

    /// Process every file in order; a broken file never stops the batch
    pub async fn run(&self, files: &[PathBuf]) -> RunReport {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(files.len());

        for path in files {
            log::info!("processing {}", path.display());
            let report = match self.sync_file(path).await {
                Ok(outcomes) => FileReport {
                    path: path.clone(),
                    outcomes,
                    error: None,
                },
                Err(e) => {
                    log::error!("skipping {}: {:#}", path.display(), e);
                    FileReport {
                        path: path.clone(),
                        outcomes: Vec::new(),
                        error: Some(format!("{:#}", e)),
                    }
                }
            };
            reports.push(report);
        }

        RunReport {
            started_at,
            files: reports,
        }
    }

    /// Parse one file and apply every row
    ///
    /// The column mapping is validated against the header before the
    /// first row is read; row failures are recorded in place.
    async fn sync_file(&self, path: &Path) -> anyhow::Result<Vec<SyncOutcome>> {
        let sheet = ingest::read_sheet(path)?;
        let columns = self.columns.resolve(&sheet)?;

        let mut outcomes = Vec::with_capacity(sheet.rows.len());
        for (idx, row) in sheet.rows.iter().enumerate() {
            // 1-based data row ordinal, header excluded
            let row_num = idx + 1;
            let outcome = match ingest::extract_record(row, &columns) {
                Ok(record) => match self.apply(row_num, &record).await {
                    Ok(outcome) => outcome,
                    Err(e) => SyncOutcome::Failed {
                        row: row_num,
                        reason: format!("{:#}", e),
                    },
                },
                Err(e) => SyncOutcome::Failed {
                    row: row_num,
                    reason: e.to_string(),
                },
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Decision rule: an exact pair is already current, a known serial is
    /// rewritten, anything else is appended
    async fn apply(&self, row: usize, record: &PcbRecord) -> anyhow::Result<SyncOutcome> {
        if self.store.exists(&record.eng_sr, &record.pcb_item).await? {
            log::debug!("skip {} , {}", record.eng_sr, record.pcb_item);
            return Ok(SyncOutcome::Skipped {
                row,
                record: record.clone(),
            });
        }

        if self.store.serial_exists(&record.eng_sr).await? {
            let rows_affected = self.store.update(&record.eng_sr, &record.pcb_item).await?;
            log::info!("updated {} , {}", record.eng_sr, record.pcb_item);
            return Ok(SyncOutcome::Updated {
                row,
                record: record.clone(),
                rows_affected,
            });
        }

        self.store.insert(&record.eng_sr, &record.pcb_item).await?;
        log::info!("inserted {} , {}", record.eng_sr, record.pcb_item);
        Ok(SyncOutcome::Inserted {
            row,
            record: record.clone(),
        })
    }
}
