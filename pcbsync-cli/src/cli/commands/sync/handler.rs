//! Sync command handler

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::*;

use crate::cli::{OutputFormat, SyncArgs};
use crate::config::AppConfig;
use crate::store::PcbStore;
use crate::sync::{RunReport, SyncOutcome, SyncRunner};

/// Process exit codes
pub mod exit_code {
    /// Run completed; row-level failures alone do not fail the process
    pub const OK: i32 = 0;
    /// At least one file could not be processed at all
    pub const FILE_FAULT: i32 = 1;
    /// Configuration or startup fault; nothing was processed
    pub const CONFIG_FAULT: i32 = 2;
}

pub async fn handle_sync_command(args: SyncArgs) -> i32 {
    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match AppConfig::resolve(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "configuration error:".red().bold(), e);
            return exit_code::CONFIG_FAULT;
        }
    };

    let code = match run_sync(&config, args.format).await {
        Ok(report) => exit_code_for(&report),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            exit_code::CONFIG_FAULT
        }
    };

    if config.pause_on_exit {
        pause_for_enter();
    }

    code
}

async fn run_sync(config: &AppConfig, format: OutputFormat) -> Result<RunReport> {
    let store = PcbStore::connect(&config.database_url).await?;

    let files = discover_files(&config.source_dir)?;
    if files.is_empty() {
        log::warn!(
            "no spreadsheet files found in {}",
            config.source_dir.display()
        );
    }

    let runner = SyncRunner::new(store, config.columns.clone());
    let report = runner.run(&files).await;

    match format {
        OutputFormat::Text => print_text_report(&report),
        OutputFormat::Json => print_json_report(&report)?,
    }

    Ok(report)
}

/// Non-recursive listing of the source folder, spreadsheet files only,
/// sorted by name so runs are deterministic
fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read source folder {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", dir.display()))?
            .path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if matches!(ext.as_deref(), Some("xlsx") | Some("xls")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn exit_code_for(report: &RunReport) -> i32 {
    if report.failed_files() > 0 {
        exit_code::FILE_FAULT
    } else {
        exit_code::OK
    }
}

fn print_text_report(report: &RunReport) {
    for file in &report.files {
        println!("{}", file.path.display().to_string().cyan());
        if let Some(error) = &file.error {
            println!("  {} {}", "failed:".red().bold(), error);
            continue;
        }
        for outcome in &file.outcomes {
            match outcome {
                SyncOutcome::Inserted { record, .. } => {
                    println!("  {} {} , {}", "inserted".green(), record.eng_sr, record.pcb_item)
                }
                SyncOutcome::Updated {
                    record,
                    rows_affected,
                    ..
                } => println!(
                    "  {} {} , {} ({} rows)",
                    "updated".yellow(),
                    record.eng_sr,
                    record.pcb_item,
                    rows_affected
                ),
                SyncOutcome::Skipped { record, .. } => {
                    println!("  {} {} , {}", "skipped".dimmed(), record.eng_sr, record.pcb_item)
                }
                SyncOutcome::Failed { row, reason } => {
                    println!("  {} row {}: {}", "failed".red(), row, reason)
                }
            }
        }
    }

    println!();
    println!(
        "done: {} inserted, {} updated, {} skipped, {} failed rows, {} failed files",
        report.inserted(),
        report.updated(),
        report.skipped(),
        report.failed_rows(),
        report.failed_files()
    );
}

fn print_json_report(report: &RunReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to serialize report")?
    );
    Ok(())
}

/// Replacement for the legacy wait-for-key console exit; only meaningful
/// on an interactive terminal
fn pause_for_enter() {
    use is_terminal::IsTerminal;

    if std::io::stdin().is_terminal() {
        println!("press Enter to close...");
        let mut buf = String::new();
        let _ = std::io::stdin().read_line(&mut buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::sync::FileReport;

    #[test]
    fn discover_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.xlsx"), b"x").unwrap();
        std::fs::write(dir.path().join("A.XLS"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub.xlsx")).unwrap();

        let files = discover_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A.XLS", "b.xlsx"]);
    }

    #[test]
    fn discover_files_errors_on_missing_folder() {
        assert!(discover_files(Path::new("/no/such/folder")).is_err());
    }

    #[test]
    fn exit_code_ignores_row_failures_but_not_file_faults() {
        let clean = RunReport {
            started_at: Utc::now(),
            files: vec![FileReport {
                path: PathBuf::from("a.xlsx"),
                outcomes: vec![SyncOutcome::Failed {
                    row: 1,
                    reason: "missing".into(),
                }],
                error: None,
            }],
        };
        assert_eq!(exit_code_for(&clean), exit_code::OK);

        let broken = RunReport {
            started_at: Utc::now(),
            files: vec![FileReport {
                path: PathBuf::from("a.xlsx"),
                outcomes: Vec::new(),
                error: Some("file not found".into()),
            }],
        };
        assert_eq!(exit_code_for(&broken), exit_code::FILE_FAULT);
    }
}
