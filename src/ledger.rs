// 📒 Period Ledger - One record per reporting period, always in period order
// CSV-backed. Every upsert rewrites the whole file (temp file + rename), so the
// on-disk order always matches logical order and a schema change migrates every
// row on the next write.
//
// Single writer assumed: concurrent processes need an external lock.

use crate::amount::{Amount, ExtractionResult};
use crate::catalog::CategoryCatalog;
use crate::error::LedgerError;
use crate::period::PeriodKey;
use chrono::{Local, NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PERIOD_COLUMN: &str = "年月";
pub const TIMESTAMP_COLUMN: &str = "更新日時";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header cells the ledger claims for itself; no category may use them
pub const RESERVED_COLUMNS: [&str; 4] = [PERIOD_COLUMN, "period", TIMESTAMP_COLUMN, "updated_at"];

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodRecord {
    pub period: PeriodKey,

    /// One amount per catalog category
    pub amounts: ExtractionResult,

    /// Stamped by `upsert`; `None` only for legacy rows written without one
    pub updated_at: Option<NaiveDateTime>,

    /// Columns this build does not know about, carried through rewrites
    pub extra: BTreeMap<String, String>,
}

impl PeriodRecord {
    pub fn new(period: PeriodKey, amounts: ExtractionResult) -> Self {
        PeriodRecord {
            period,
            amounts,
            updated_at: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn amount(&self, category: &str) -> Amount {
        self.amounts.get(category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertOutcome::Inserted => write!(f, "inserted"),
            UpsertOutcome::Updated => write!(f, "updated"),
        }
    }
}

/// Contents of the backing file
#[derive(Debug, Default)]
struct LedgerTable {
    /// Unknown columns in file order
    extra_columns: Vec<String>,
    records: Vec<PeriodRecord>,
}

enum Column {
    Period,
    Timestamp,
    Category(String),
    Extra(String),
}

// ============================================================================
// LEDGER
// ============================================================================

pub struct Ledger {
    path: PathBuf,
    catalog: CategoryCatalog,
}

impl Ledger {
    /// Handle on a ledger file. No I/O until the first load or upsert.
    pub fn open<P: AsRef<Path>>(path: P, catalog: CategoryCatalog) -> Self {
        Ledger {
            path: path.as_ref().to_path_buf(),
            catalog,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// All records, ascending by period, no duplicate keys.
    ///
    /// An absent ledger is created empty.
    pub fn load_all(&self) -> Result<Vec<PeriodRecord>, LedgerError> {
        self.initialize()?;
        Ok(self.read()?.records)
    }

    /// Newest period on file
    pub fn latest(&self) -> Result<Option<PeriodRecord>, LedgerError> {
        Ok(self.load_all()?.pop())
    }

    /// Insert or overwrite the record for `record.period`, then rewrite the
    /// ledger sorted by period.
    ///
    /// The period key is stored as given; callers keep it zero-padded.
    pub fn upsert(&self, record: PeriodRecord) -> Result<UpsertOutcome, LedgerError> {
        self.initialize()?;
        let mut table = self.read()?;

        let now = Local::now().naive_local();
        let stamped = now.with_nanosecond(0).unwrap_or(now);

        for column in record.extra.keys() {
            if !table.extra_columns.contains(column) {
                table.extra_columns.push(column.clone());
            }
        }

        let outcome = match table
            .records
            .iter_mut()
            .find(|existing| existing.period == record.period)
        {
            Some(existing) => {
                existing.amounts = record.amounts;
                existing.updated_at = Some(stamped);
                existing.extra.extend(record.extra);
                UpsertOutcome::Updated
            }
            None => {
                table.records.push(PeriodRecord {
                    updated_at: Some(stamped),
                    ..record
                });
                UpsertOutcome::Inserted
            }
        };

        table.records.sort_by(|a, b| a.period.cmp(&b.period));
        self.write(&table)?;

        info!(
            path = %self.path.display(),
            records = table.records.len(),
            %outcome,
            "Ledger written"
        );

        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Storage
    // ------------------------------------------------------------------------

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> LedgerError {
        LedgerError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    /// Absent → Initialized: create parent directories and a header-only file
    fn initialize(&self) -> Result<(), LedgerError> {
        if self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        self.write(&LedgerTable::default())?;
        info!(path = %self.path.display(), "Initialized empty ledger");
        Ok(())
    }

    fn classify_header(&self, header: &str) -> Column {
        let header = header.trim().trim_start_matches('\u{feff}');
        if header == PERIOD_COLUMN || header == "period" {
            Column::Period
        } else if header == TIMESTAMP_COLUMN || header == "updated_at" {
            Column::Timestamp
        } else if let Some(category) = self.catalog.lookup(header) {
            Column::Category(category.name.clone())
        } else {
            Column::Extra(header.to_string())
        }
    }

    fn read(&self) -> Result<LedgerTable, LedgerError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;

        let headers = reader.headers().map_err(|e| self.csv_error(e))?.clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Ok(LedgerTable::default());
        }

        let columns: Vec<Column> = headers.iter().map(|h| self.classify_header(h)).collect();
        if !columns.iter().any(|c| matches!(c, Column::Period)) {
            return Err(LedgerError::MissingPeriodColumn {
                path: self.path.clone(),
            });
        }

        let extra_columns: Vec<String> = columns
            .iter()
            .filter_map(|c| match c {
                Column::Extra(name) => Some(name.clone()),
                _ => None,
            })
            .collect();
        if !extra_columns.is_empty() {
            warn!(columns = ?extra_columns, "Ledger has columns outside the catalog, carrying them over");
        }

        let mut by_period: BTreeMap<PeriodKey, PeriodRecord> = BTreeMap::new();

        for result in reader.records() {
            let row = result.map_err(|e| self.csv_error(e))?;
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let mut period = None;
            let mut timestamp = None;
            let mut amounts = Vec::new();
            let mut extra = BTreeMap::new();

            for (column, cell) in columns.iter().zip(row.iter()) {
                let cell = cell.trim();
                match column {
                    Column::Period => period = Some(PeriodKey::from_raw(cell)),
                    Column::Timestamp => timestamp = Some(cell),
                    Column::Category(name) => amounts.push((name, cell)),
                    Column::Extra(name) => {
                        extra.insert(name.clone(), cell.to_string());
                    }
                }
            }

            let Some(period) = period.filter(|p| !p.as_str().is_empty()) else {
                warn!(row = ?row, "Skipping ledger row without a period");
                continue;
            };

            let mut record = PeriodRecord::new(period, ExtractionResult::not_found(&self.catalog));
            for (name, cell) in amounts {
                record.amounts.set(name, parse_amount_cell(&record.period, name, cell)?);
            }
            record.updated_at = parse_timestamp_cell(&record.period, timestamp)?;
            record.extra = extra;

            if by_period.contains_key(&record.period) {
                warn!(period = %record.period, "Duplicate period in ledger, keeping the later row");
            }
            by_period.insert(record.period.clone(), record);
        }

        Ok(LedgerTable {
            extra_columns,
            records: by_period.into_values().collect(),
        })
    }

    fn header(&self, table: &LedgerTable) -> Vec<String> {
        let mut header = vec![PERIOD_COLUMN.to_string()];
        header.extend(self.catalog.categories().iter().map(|c| c.label.clone()));
        header.extend(table.extra_columns.iter().cloned());
        header.push(TIMESTAMP_COLUMN.to_string());
        header
    }

    /// Full rewrite through a sibling temp file so a failed write never
    /// leaves a partial ledger behind
    fn write(&self, table: &LedgerTable) -> Result<(), LedgerError> {
        let tmp = temp_path(&self.path);

        let result = self.write_to(&tmp, table).and_then(|_| {
            fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
        });

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn write_to(&self, tmp: &Path, table: &LedgerTable) -> Result<(), LedgerError> {
        let mut writer = csv::Writer::from_path(tmp).map_err(|e| self.csv_error(e))?;

        writer
            .write_record(self.header(table))
            .map_err(|e| self.csv_error(e))?;

        for record in &table.records {
            let mut row = vec![record.period.as_str().to_string()];
            row.extend(self.catalog.names().map(|name| match record.amount(name) {
                Amount::Value(v) => v.to_string(),
                Amount::NotFound => String::new(),
            }));
            row.extend(
                table
                    .extra_columns
                    .iter()
                    .map(|column| record.extra.get(column).cloned().unwrap_or_default()),
            );
            row.push(
                record
                    .updated_at
                    .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                    .unwrap_or_default(),
            );
            writer.write_record(&row).map_err(|e| self.csv_error(e))?;
        }

        writer.flush().map_err(|e| self.io_error(e))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "ledger.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn parse_amount_cell(period: &PeriodKey, column: &str, cell: &str) -> Result<Amount, LedgerError> {
    if cell.is_empty() {
        return Ok(Amount::NotFound);
    }
    Amount::from_digit_run(cell).ok_or_else(|| LedgerError::MalformedAmount {
        period: period.to_string(),
        column: column.to_string(),
        value: cell.to_string(),
    })
}

fn parse_timestamp_cell(
    period: &PeriodKey,
    cell: Option<&str>,
) -> Result<Option<NaiveDateTime>, LedgerError> {
    match cell {
        None | Some("") => Ok(None),
        Some(value) => NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
            .map(Some)
            .map_err(|_| LedgerError::MalformedTimestamp {
                period: period.to_string(),
                value: value.to_string(),
            }),
    }
}

// ============================================================================
// TESTS
// ============================================================================
