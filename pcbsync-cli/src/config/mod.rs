//! Configuration loading and validation
//!
//! Resolution order, strongest first: CLI flags, `PCBSYNC_*` environment
//! variables, then the TOML config file. The resolved value is constructed
//! once and handed to the runner; nothing reads process-wide state later.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::cli::SyncArgs;
use crate::ingest::{ColumnMapping, ColumnRef};

pub const SOURCE_DIR_ENV: &str = "PCBSYNC_SOURCE_DIR";
pub const DATABASE_URL_ENV: &str = "PCBSYNC_DATABASE_URL";

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source_dir: PathBuf,
    pub database_url: String,
    pub columns: ColumnMapping,
    pub pause_on_exit: bool,
}

/// On-disk layout of the TOML config file
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    source_dir: Option<PathBuf>,
    database_url: Option<String>,
    #[serde(default)]
    columns: ColumnMapping,
    #[serde(default)]
    pause_on_exit: bool,
}

impl AppConfig {
    /// Layer CLI flags over env vars over the config file, then validate
    pub fn resolve(args: &SyncArgs) -> Result<Self> {
        let file = load_config_file(args.config.as_deref())?;

        let source_dir = args
            .source_dir
            .clone()
            .or_else(|| std::env::var(SOURCE_DIR_ENV).ok().map(PathBuf::from))
            .or(file.source_dir)
            .context(
                "no source folder configured (use --source-dir, PCBSYNC_SOURCE_DIR, \
                 or source_dir in the config file)",
            )?;

        let database_url = args
            .database_url
            .clone()
            .or_else(|| std::env::var(DATABASE_URL_ENV).ok())
            .or(file.database_url)
            .context(
                "no database URL configured (use --database-url, PCBSYNC_DATABASE_URL, \
                 or database_url in the config file)",
            )?;

        let mut columns = file.columns;
        if let Some(serial) = &args.serial_column {
            columns.serial = ColumnRef::parse(serial);
        }
        if let Some(item) = &args.item_column {
            columns.item = ColumnRef::parse(item);
        }

        let config = Self {
            source_dir,
            database_url,
            columns,
            pause_on_exit: args.pause || file.pause_on_exit,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.source_dir.is_dir() {
            bail!(
                "source folder {} does not exist or is not a directory",
                self.source_dir.display()
            );
        }
        if self.database_url.trim().is_empty() {
            bail!("database URL is empty");
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pcbsync").join("config.toml"))
}

fn load_config_file(explicit: Option<&Path>) -> Result<ConfigFile> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            Some(path.to_path_buf())
        }
        None => default_config_path().filter(|path| path.exists()),
    };

    let Some(path) = path else {
        return Ok(ConfigFile::default());
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_file_parses_columns_by_name_and_index() {
        let raw = r#"
            source_dir = "/tmp/pcb"
            database_url = "sqlite://esop.db"
            pause_on_exit = true

            [columns]
            serial = "Serial"
            item = 2
        "#;
        let file: ConfigFile = toml::from_str(raw).unwrap();
        assert_eq!(file.source_dir.as_deref(), Some(Path::new("/tmp/pcb")));
        assert_eq!(file.database_url.as_deref(), Some("sqlite://esop.db"));
        assert!(file.pause_on_exit);
        assert_eq!(file.columns.serial, ColumnRef::Name("Serial".into()));
        assert_eq!(file.columns.item, ColumnRef::Index(2));
    }

    #[test]
    fn config_file_defaults_to_legacy_column_layout() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(file.columns.serial, ColumnRef::Index(0));
        assert_eq!(file.columns.item, ColumnRef::Index(2));
        assert!(!file.pause_on_exit);
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let err = load_config_file(Some(Path::new("/no/such/config.toml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "source_dir = [not toml").unwrap();
        let err = load_config_file(Some(tmp.path())).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn validate_rejects_missing_source_dir() {
        let config = AppConfig {
            source_dir: PathBuf::from("/no/such/folder"),
            database_url: "sqlite://esop.db".into(),
            columns: ColumnMapping::default(),
            pause_on_exit: false,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_database_url() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            source_dir: dir.path().to_path_buf(),
            database_url: "   ".into(),
            columns: ColumnMapping::default(),
            pause_on_exit: false,
        };
        assert!(config.validate().is_err());
    }
}
