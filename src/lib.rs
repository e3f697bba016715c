// Securities Ledger - Core Library
// Holdings extraction from statement pages and the per-period ledger store

pub mod amount;
pub mod catalog;    // Category registry: names, labels, aliases, exclusions
pub mod config;
pub mod document;   // Page text + table grids handed over by the PDF layer
pub mod error;
pub mod extractor;  // Line / pattern / table strategies
pub mod ledger;     // CSV period ledger with idempotent upsert
pub mod period;
pub mod pipeline;

// Re-export commonly used types
pub use amount::{Amount, ExtractionResult};
pub use catalog::{Category, CategoryCatalog};
pub use config::Config;
pub use document::{Document, Page, TableGrid};
pub use error::{CatalogError, ConfigError, InputError, LedgerError};
pub use extractor::{
    extract, Extraction, ExtractionStrategy, FieldExtractor, StrategyKind,
    DEFAULT_MIN_DIGITS,
};
pub use ledger::{Ledger, PeriodRecord, UpsertOutcome};
pub use period::{extract_period_key, PeriodKey};
pub use pipeline::{DocumentExtraction, Pipeline};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
