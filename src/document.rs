// 📄 Document Input - Page text and table grids from the external PDF parser
// The parser itself lives outside this crate; we only consume its JSON output:
//
// { "pages": [ { "text": "...", "tables": [ [ ["国債", "12,345"], [null, "..."] ] ] } ] }

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One table row; cells the parser could not fill are `None`
pub type Row = Vec<Option<String>>;

/// Loosely segmented table: a sequence of rows of optional cells
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableGrid {
    pub rows: Vec<Row>,
}

impl TableGrid {
    pub fn new(rows: Vec<Row>) -> Self {
        TableGrid { rows }
    }

    /// Build from string cells; empty strings become `None`
    pub fn from_cells(rows: &[&[&str]]) -> Self {
        TableGrid {
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                        .collect()
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub tables: Vec<TableGrid>,
}

impl Page {
    pub fn new(text: &str, tables: Vec<TableGrid>) -> Self {
        Page {
            text: text.to_string(),
            tables,
        }
    }

    /// No text and no table rows: nothing the engine could read
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.tables.iter().all(TableGrid::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(pages: Vec<Page>) -> Self {
        Document { pages }
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Load parser output from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| InputError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
