// ⚙️ Configuration
// Every field has a default; a JSON file only needs the keys it changes.

use crate::catalog::CategoryCatalog;
use crate::error::{CatalogError, ConfigError};
use crate::extractor::DEFAULT_MIN_DIGITS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides `ledger_path` when set
pub const LEDGER_PATH_ENV: &str = "SECURITIES_LEDGER_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CSV ledger location
    pub ledger_path: PathBuf,

    /// Zero-based page carrying the holdings table (the statement's second page)
    pub statement_page: usize,

    /// Shortest digit string accepted as an amount
    pub min_amount_digits: usize,

    /// JSON catalog replacing the built-in categories
    pub catalog_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ledger_path: PathBuf::from("data/securities_ledger.csv"),
            statement_page: 1,
            min_amount_digits: DEFAULT_MIN_DIGITS,
            catalog_path: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides
    pub fn with_env(mut self) -> Self {
        if let Some(path) = std::env::var_os(LEDGER_PATH_ENV).filter(|p| !p.is_empty()) {
            self.ledger_path = PathBuf::from(path);
        }
        self
    }

    /// The configured catalog, or the built-in one
    pub fn catalog(&self) -> Result<CategoryCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => CategoryCatalog::from_file(path),
            None => Ok(CategoryCatalog::standard()),
        }
    }
}
