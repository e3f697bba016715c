// 🏷️ Category Catalog - Securities categories and their surface forms
// Immutable after construction. Exclusion between categories is declared data,
// not an artifact of iteration order.

use crate::error::CatalogError;
use crate::ledger::RESERVED_COLUMNS;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

// ============================================================================
// CATEGORY
// ============================================================================

/// A named line item of the holdings table.
///
/// `aliases` are tried in order: spaced renderings ("短 期 社 債") come before the
/// compact form because a compact alias can be a literal substring of a longer,
/// more specific label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable identifier, e.g. "short-term-note"
    pub name: String,

    /// Column header used in the ledger, e.g. "短期社債"
    pub label: String,

    /// Surface forms, most specific first
    pub aliases: Vec<String>,

    /// Categories whose alias match invalidates a match of this one on the same line
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_by: Vec<String>,
}

impl Category {
    pub fn new(name: &str, label: &str, aliases: &[&str]) -> Self {
        Category {
            name: name.to_string(),
            label: label.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            excluded_by: Vec::new(),
        }
    }

    /// Builder pattern: declare an excluding category
    pub fn excluded_by(mut self, category: &str) -> Self {
        self.excluded_by.push(category.to_string());
        self
    }

    pub fn has_exclusions(&self) -> bool {
        !self.excluded_by.is_empty()
    }
}

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl CategoryCatalog {
    /// Build a catalog, validating names, aliases and exclusion references
    pub fn new(mut categories: Vec<Category>) -> Result<Self, CatalogError> {
        for category in categories.iter_mut() {
            category.aliases.retain(|a| !a.trim().is_empty());
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if !seen.insert(category.name.as_str()) {
                return Err(CatalogError::DuplicateCategory(category.name.clone()));
            }
            if category.aliases.is_empty() {
                return Err(CatalogError::NoAliases(category.name.clone()));
            }
        }

        // Names and labels both resolve ledger headers, so together they must be unique
        let mut headers = HashSet::new();
        for category in &categories {
            let keys: BTreeSet<&str> = [category.name.trim(), category.label.trim()]
                .into_iter()
                .collect();
            for key in keys {
                if RESERVED_COLUMNS.contains(&key) {
                    return Err(CatalogError::ReservedLabel {
                        category: category.name.clone(),
                        label: key.to_string(),
                    });
                }
                if !headers.insert(key) {
                    return Err(CatalogError::DuplicateLabel(key.to_string()));
                }
            }
        }

        for category in &categories {
            for excluding in &category.excluded_by {
                if !seen.contains(excluding.as_str()) {
                    return Err(CatalogError::UnknownExclusion {
                        category: category.name.clone(),
                        excluded_by: excluding.clone(),
                    });
                }
            }
        }

        Ok(CategoryCatalog { categories })
    }

    /// The holdings categories of the monthly regional-bank statement.
    ///
    /// Order is the ledger column order.
    pub fn standard() -> Self {
        CategoryCatalog {
            categories: vec![
                Category::new("government-bond", "国債", &["国 債", "国債"]),
                Category::new("municipal-bond", "地方債", &["地 方 債", "地方債"]),
                Category::new("short-term-note", "短期社債", &["短 期 社 債", "短期社債"]),
                Category::new("corporate-bond", "社債", &["社 債", "社債"])
                    .excluded_by("short-term-note"),
                Category::new("equity", "株式", &["株 式", "株式"]),
                Category::new("foreign-securities", "外国証券", &["外 国 証 券", "外国証券"]),
                Category::new(
                    "other-securities",
                    "その他の証券",
                    &["そ の 他 の 証 券", "その他の証券", "そ の 他 証 券"],
                ),
            ],
        }
    }

    /// Load a catalog from a JSON array of categories
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let categories: Vec<Category> =
            serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        CategoryCatalog::new(categories)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Resolve by name or by ledger label
    pub fn lookup(&self, key: &str) -> Option<&Category> {
        let key = key.trim();
        self.categories
            .iter()
            .find(|c| c.name == key || c.label == key)
    }

    /// Aliases of a category in try order; empty for unknown names
    pub fn aliases(&self, name: &str) -> &[String] {
        self.get(name).map(|c| c.aliases.as_slice()).unwrap_or(&[])
    }

    /// Names of the categories that pre-empt `name`
    pub fn excluded_by(&self, name: &str) -> BTreeSet<&str> {
        self.get(name)
            .map(|c| c.excluded_by.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Every alias of every category that pre-empts `name`
    pub fn excluding_aliases(&self, name: &str) -> Vec<&str> {
        self.excluded_by(name)
            .into_iter()
            .filter_map(|excluding| self.get(excluding))
            .flat_map(|c| c.aliases.iter().map(String::as_str))
            .collect()
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        CategoryCatalog::standard()
    }
}

// ============================================================================
// TESTS
// ============================================================================
