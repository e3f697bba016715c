use std::path::PathBuf;
use thiserror::Error;

/// Problems building a category catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Duplicate category: {0}")]
    DuplicateCategory(String),

    #[error("Category {0} has no aliases")]
    NoAliases(String),

    #[error("Ledger column {0} would belong to more than one category")]
    DuplicateLabel(String),

    #[error("Category {category} uses reserved ledger column {label}")]
    ReservedLabel { category: String, label: String },

    #[error("Category {category} is excluded by unknown category {excluded_by}")]
    UnknownExclusion {
        category: String,
        excluded_by: String,
    },

    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The "unusable input" outcome: the document cannot feed the engine at all.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Document has {available} page(s), statement page {requested} is missing")]
    MissingPage { requested: usize, available: usize },

    #[error("Page {index} has no text and no table rows")]
    EmptyPage { index: usize },

    #[error("No period found in the document and none supplied")]
    UnknownPeriod,

    #[error("Invalid period key: {0:?}")]
    InvalidPeriod(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Failed to read document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Ledger store failures. Nothing is persisted when one of these is returned.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Ledger {path} has no period column in its header")]
    MissingPeriodColumn { path: PathBuf },

    #[error("Malformed amount {value:?} in column {column} for period {period}")]
    MalformedAmount {
        period: String,
        column: String,
        value: String,
    },

    #[error("Malformed timestamp {value:?} for period {period}")]
    MalformedTimestamp { period: String, value: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
