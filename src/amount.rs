// Amount value type and the per-document extraction result

use crate::catalog::CategoryCatalog;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// AMOUNT
// ============================================================================

/// A figure in the statement's reporting unit (millions of yen).
///
/// Never negative, never fractional. `NotFound` is an explicit sentinel, not zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Amount {
    Value(u64),
    #[default]
    NotFound,
}

impl Amount {
    pub fn value(&self) -> Option<u64> {
        match self {
            Amount::Value(v) => Some(*v),
            Amount::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Amount::Value(_))
    }

    /// Parse a digit run such as "12,345", dropping thousands separators.
    ///
    /// Returns `None` unless what is left is all ASCII digits.
    pub fn from_digit_run(run: &str) -> Option<Amount> {
        let digits = strip_separators(run);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u64>().ok().map(Amount::Value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount::Value(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Value(v) => write!(f, "{}", v),
            Amount::NotFound => write!(f, "not found"),
        }
    }
}

/// Remove thousands separators (ASCII and full-width commas)
pub fn strip_separators(run: &str) -> String {
    run.chars().filter(|c| *c != ',' && *c != '，').collect()
}

// ============================================================================
// EXTRACTION RESULT
// ============================================================================

/// One amount per catalog category, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    entries: Vec<(String, Amount)>,
}

impl ExtractionResult {
    /// Every category of the catalog set to `NotFound`
    pub fn not_found(catalog: &CategoryCatalog) -> Self {
        ExtractionResult {
            entries: catalog
                .names()
                .map(|name| (name.to_string(), Amount::NotFound))
                .collect(),
        }
    }

    /// Amount for a category; `NotFound` for names outside the catalog
    pub fn get(&self, category: &str) -> Amount {
        self.entries
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, amount)| *amount)
            .unwrap_or(Amount::NotFound)
    }

    /// Overwrite the amount of a known category. Returns false for unknown names.
    pub fn set(&mut self, category: &str, amount: Amount) -> bool {
        match self.entries.iter_mut().find(|(name, _)| name == category) {
            Some(entry) => {
                entry.1 = amount;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Amount)> {
        self.entries.iter().map(|(name, amount)| (name.as_str(), *amount))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn found_count(&self) -> usize {
        self.entries.iter().filter(|(_, a)| a.is_found()).count()
    }
}
