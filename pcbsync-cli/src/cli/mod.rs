//! Command-line surface

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "pcbsync-cli",
    about = "Reconciles PCB part spreadsheets into the E-SOP database",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest every spreadsheet in the source folder and upsert its records
    Sync(SyncArgs),
}

#[derive(Args)]
pub struct SyncArgs {
    /// Folder containing the .xlsx/.xls files to ingest
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Database connection URL (e.g. sqlite://esop.db)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Path to a TOML config file (default: <config dir>/pcbsync/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Column holding the engineering serial: a header name or 0-based index
    #[arg(long)]
    pub serial_column: Option<String>,

    /// Column holding the PCB item: a header name or 0-based index
    #[arg(long)]
    pub item_column: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Wait for Enter before exiting (ignored when stdin is not a terminal)
    #[arg(long)]
    pub pause: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
