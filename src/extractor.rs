// 🔎 Field Extraction Engine - Holdings figures from page text and table cells
// Three strategies, tried per category in order, first validated hit wins:
// line scan → pattern scan → table scan

use crate::amount::{strip_separators, Amount, ExtractionResult};
use crate::catalog::{Category, CategoryCatalog};
use crate::document::TableGrid;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Shortest digit string accepted as a figure. Page numbers and footnote marks
/// are shorter than any holding at this report's scale.
pub const DEFAULT_MIN_DIGITS: usize = 4;

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Literal alias search line by line
    LineScan,
    /// Whitespace-tolerant regex over the whole text
    PatternScan,
    /// Row containment over the table grid
    TableScan,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::LineScan => "line-scan",
            StrategyKind::PatternScan => "pattern-scan",
            StrategyKind::TableScan => "table-scan",
        }
    }
}

/// Inspection-only trace of an extraction run.
///
/// Entries are mirrored to `tracing` at debug level.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Vec<String>,
}

impl DiagnosticLog {
    pub fn record(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!("{}", entry);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Output of `FieldExtractor::extract`
#[derive(Debug, Clone)]
pub struct Extraction {
    pub amounts: ExtractionResult,

    /// Which strategy produced each found amount
    pub found_by: Vec<(String, StrategyKind)>,

    pub diagnostics: Vec<String>,
}

impl Extraction {
    pub fn found_by(&self, category: &str) -> Option<StrategyKind> {
        self.found_by
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, kind)| *kind)
    }
}

/// Everything a strategy may look at for one extraction run
pub struct ExtractionContext<'a> {
    pub catalog: &'a CategoryCatalog,
    pub exclusions: &'a ExclusionPatterns,
    pub text: &'a str,
    pub lines: Vec<&'a str>,
    pub tables: &'a [TableGrid],
    pub min_digits: usize,
}

// ============================================================================
// STRATEGY TRAIT
// ============================================================================

/// One way of locating a category's figure.
///
/// Returns the validated amount or `None`; never fails. Implementations record
/// what they inspected in the log but must not branch on it.
pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn find(
        &self,
        category: &Category,
        ctx: &ExtractionContext<'_>,
        log: &mut DiagnosticLog,
    ) -> Option<u64>;
}

// ============================================================================
// DIGIT RUNS
// ============================================================================

/// First run of ASCII digits and thousands separators, starting at a digit
pub fn first_digit_run(s: &str) -> Option<&str> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let len = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '，'))
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

/// Accept a digit run as an amount if it has at least `min_digits` digits
pub fn validate_run(run: &str, min_digits: usize) -> Result<u64, String> {
    let value = match Amount::from_digit_run(run) {
        Some(Amount::Value(v)) => v,
        _ => return Err(format!("'{}' is not a plain number", run)),
    };

    let digits = strip_separators(run).len();
    if digits < min_digits {
        return Err(format!("'{}' has {} digit(s), need {}", run, digits, min_digits));
    }

    Ok(value)
}

// ============================================================================
// EXCLUSIONS
// ============================================================================

/// Label patterns of the categories that pre-empt each category, compiled once
/// per catalog. Interior whitespace is optional, so "短期 社債" and "短 期社債"
/// both count as a short-term note label.
pub struct ExclusionPatterns {
    by_category: Vec<(String, Vec<Regex>)>,
}

impl ExclusionPatterns {
    pub fn new(catalog: &CategoryCatalog) -> Self {
        let by_category = catalog
            .categories()
            .iter()
            .filter(|category| category.has_exclusions())
            .map(|category| {
                let patterns = catalog
                    .excluding_aliases(&category.name)
                    .into_iter()
                    .filter_map(|alias| compile(&label_pattern(alias)))
                    .collect();
                (category.name.clone(), patterns)
            })
            .collect();

        ExclusionPatterns { by_category }
    }

    pub fn patterns(&self, category: &str) -> &[Regex] {
        self.by_category
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, patterns)| patterns.as_slice())
            .unwrap_or(&[])
    }

    /// First excluding label in `text`, as written there
    pub fn find_in<'t>(&self, category: &str, text: &'t str) -> Option<&'t str> {
        self.patterns(category)
            .iter()
            .find_map(|re| re.find(text))
            .map(|m| m.as_str())
    }

    /// Byte spans of every excluding label in `text`
    pub fn spans(&self, category: &str, text: &str) -> Vec<(usize, usize)> {
        self.patterns(category)
            .iter()
            .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.end())))
            .collect()
    }
}

/// Drop all whitespace, for spacing-blind containment checks
fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

// ============================================================================
// STRATEGY 1: LINE SCAN
// ============================================================================

/// Literal alias search on each line; the figure is the first digit run after the alias.
///
/// A line that also carries an excluding category's label, however it is
/// spaced, is skipped, so "短 期 社 債 12,345" and "短期 社債 12,345" never feed "社債".
pub struct LineScan;

impl ExtractionStrategy for LineScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LineScan
    }

    fn find(
        &self,
        category: &Category,
        ctx: &ExtractionContext<'_>,
        log: &mut DiagnosticLog,
    ) -> Option<u64> {
        for alias in &category.aliases {
            for (idx, line) in ctx.lines.iter().enumerate() {
                let Some(pos) = line.find(alias.as_str()) else {
                    continue;
                };

                if let Some(ex) = ctx.exclusions.find_in(&category.name, line) {
                    log.record(format!(
                        "line-scan: skip line {} for {}, contains '{}': {}",
                        idx + 1,
                        category.name,
                        ex,
                        line.trim()
                    ));
                    continue;
                }

                log.record(format!(
                    "line-scan: {} candidate line {} (alias '{}'): {}",
                    category.name,
                    idx + 1,
                    alias,
                    line.trim()
                ));

                let rest = &line[pos + alias.len()..];
                match first_digit_run(rest) {
                    None => log.record(format!(
                        "line-scan: no number after '{}' on line {}",
                        alias,
                        idx + 1
                    )),
                    Some(run) => match validate_run(run, ctx.min_digits) {
                        Ok(value) => {
                            log.record(format!(
                                "line-scan: accepted {} = {}",
                                category.name, value
                            ));
                            return Some(value);
                        }
                        Err(reason) => log.record(format!(
                            "line-scan: rejected for {}: {}",
                            category.name, reason
                        )),
                    },
                }
            }
        }

        None
    }
}

// ============================================================================
// STRATEGY 2: PATTERN SCAN
// ============================================================================

struct CategoryPatterns {
    name: String,
    /// (alias, "<alias>\s+<digits>") in alias order
    aliases: Vec<(String, Regex)>,
}

/// Regex fallback: interior whitespace of an alias matches any amount of
/// whitespace (including none), and the alias must be followed by whitespace and
/// a digit run. A hit whose label lies inside an excluding category's label is
/// discarded.
pub struct PatternScan {
    patterns: Vec<CategoryPatterns>,
}

/// `短 期 社 債` → `短\s*期\s*社\s*債`
pub fn label_pattern(alias: &str) -> String {
    alias
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s*")
}

fn amount_pattern(alias: &str) -> String {
    format!(r"(?P<label>{})\s+(?P<amount>[0-9,]+)", label_pattern(alias))
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "Skipping alias pattern that does not compile");
            None
        }
    }
}

impl PatternScan {
    pub fn new(catalog: &CategoryCatalog) -> Self {
        let patterns = catalog
            .categories()
            .iter()
            .map(|category| CategoryPatterns {
                name: category.name.clone(),
                aliases: category
                    .aliases
                    .iter()
                    .filter_map(|alias| {
                        compile(&amount_pattern(alias)).map(|re| (alias.clone(), re))
                    })
                    .collect(),
            })
            .collect();

        PatternScan { patterns }
    }
}

impl ExtractionStrategy for PatternScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PatternScan
    }

    fn find(
        &self,
        category: &Category,
        ctx: &ExtractionContext<'_>,
        log: &mut DiagnosticLog,
    ) -> Option<u64> {
        let patterns = self.patterns.iter().find(|p| p.name == category.name)?;

        let exclusion_spans = ctx.exclusions.spans(&category.name, ctx.text);

        for (alias, re) in &patterns.aliases {
            for caps in re.captures_iter(ctx.text) {
                let (Some(label), Some(amount)) = (caps.name("label"), caps.name("amount"))
                else {
                    continue;
                };

                let inside = exclusion_spans
                    .iter()
                    .find(|(start, end)| *start <= label.start() && label.end() <= *end);
                if let Some((start, end)) = inside {
                    log.record(format!(
                        "pattern-scan: skip '{}' for {}, part of '{}'",
                        label.as_str(),
                        category.name,
                        &ctx.text[*start..*end]
                    ));
                    continue;
                }

                log.record(format!(
                    "pattern-scan: {} candidate (alias '{}'): {}",
                    category.name,
                    alias,
                    caps.get(0).map(|m| m.as_str()).unwrap_or_default()
                ));

                match validate_run(amount.as_str(), ctx.min_digits) {
                    Ok(value) => {
                        log.record(format!(
                            "pattern-scan: accepted {} = {}",
                            category.name, value
                        ));
                        return Some(value);
                    }
                    Err(reason) => log.record(format!(
                        "pattern-scan: rejected for {}: {}",
                        category.name, reason
                    )),
                }
            }
        }

        None
    }
}

// ============================================================================
// STRATEGY 3: TABLE SCAN
// ============================================================================

/// Last resort: a row matches when its joined cells contain an alias, ignoring
/// whitespace; the figure is the first cell whose digit run validates. Rows
/// carrying an excluding label are skipped.
pub struct TableScan;

impl ExtractionStrategy for TableScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TableScan
    }

    fn find(
        &self,
        category: &Category,
        ctx: &ExtractionContext<'_>,
        log: &mut DiagnosticLog,
    ) -> Option<u64> {
        for (table_idx, table) in ctx.tables.iter().enumerate() {
            for (row_idx, row) in table.rows.iter().enumerate() {
                if row.is_empty() {
                    continue;
                }

                let joined = row
                    .iter()
                    .map(|cell| cell.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(" ");

                // Cell text is split and spaced unpredictably; match aliases spacing-blind
                let compacted = compact(&joined);
                let Some(alias) = category
                    .aliases
                    .iter()
                    .find(|alias| compacted.contains(compact(alias).as_str()))
                else {
                    continue;
                };

                if let Some(ex) = ctx.exclusions.find_in(&category.name, &joined) {
                    log.record(format!(
                        "table-scan: skip table {} row {} for {}, contains '{}'",
                        table_idx + 1,
                        row_idx,
                        category.name,
                        ex
                    ));
                    continue;
                }

                log.record(format!(
                    "table-scan: {} candidate table {} row {} (alias '{}'): {:?}",
                    category.name,
                    table_idx + 1,
                    row_idx,
                    alias,
                    row
                ));

                for (cell_idx, cell) in row.iter().enumerate() {
                    let Some(run) = cell.as_deref().and_then(first_digit_run) else {
                        continue;
                    };

                    match validate_run(run, ctx.min_digits) {
                        Ok(value) => {
                            log.record(format!(
                                "table-scan: accepted {} = {} from cell {}",
                                category.name, value, cell_idx
                            ));
                            return Some(value);
                        }
                        Err(reason) => log.record(format!(
                            "table-scan: cell {} rejected: {}",
                            cell_idx, reason
                        )),
                    }
                }
            }
        }

        None
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct FieldExtractor {
    catalog: CategoryCatalog,
    exclusions: ExclusionPatterns,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    min_digits: usize,
}

impl FieldExtractor {
    /// Engine over `catalog` with the three strategies in their fixed order
    pub fn new(catalog: CategoryCatalog) -> Self {
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(LineScan),
            Box::new(PatternScan::new(&catalog)),
            Box::new(TableScan),
        ];

        FieldExtractor {
            exclusions: ExclusionPatterns::new(&catalog),
            catalog,
            strategies,
            min_digits: DEFAULT_MIN_DIGITS,
        }
    }

    /// Builder pattern: override the digit-count validation threshold
    pub fn with_min_digits(mut self, min_digits: usize) -> Self {
        self.min_digits = min_digits.max(1);
        self
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn min_digits(&self) -> usize {
        self.min_digits
    }

    /// Resolve every catalog category against one page.
    ///
    /// Pure: no I/O, no shared state. Missing vocabulary, empty text or an empty
    /// grid only produce `NotFound` entries.
    pub fn extract(&self, page_text: &str, tables: &[TableGrid]) -> Extraction {
        let ctx = ExtractionContext {
            catalog: &self.catalog,
            exclusions: &self.exclusions,
            text: page_text,
            lines: page_text.lines().collect(),
            tables,
            min_digits: self.min_digits,
        };

        let mut log = DiagnosticLog::default();
        let mut amounts = ExtractionResult::not_found(&self.catalog);
        let mut found_by = Vec::new();

        for category in self.catalog.categories() {
            log.record(format!("searching {} ({})", category.name, category.label));

            let hit = self.strategies.iter().find_map(|strategy| {
                strategy
                    .find(category, &ctx, &mut log)
                    .map(|value| (strategy.kind(), value))
            });

            match hit {
                Some((kind, value)) => {
                    amounts.set(&category.name, Amount::Value(value));
                    found_by.push((category.name.clone(), kind));
                }
                None => log.record(format!("{}: not found by any strategy", category.name)),
            }
        }

        info!(
            found = amounts.found_count(),
            total = amounts.len(),
            "Extraction finished"
        );

        Extraction {
            amounts,
            found_by,
            diagnostics: log.into_entries(),
        }
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        FieldExtractor::new(CategoryCatalog::standard())
    }
}

/// Extract with the standard catalog and default validation
pub fn extract(page_text: &str, tables: &[TableGrid]) -> Extraction {
    FieldExtractor::default().extract(page_text, tables)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(extraction: &Extraction, category: &str) -> Amount {
        extraction.amounts.get(category)
    }

    #[test]
    fn test_first_digit_run() {
        assert_eq!(first_digit_run("  12,345 67"), Some("12,345"));
        assert_eq!(first_digit_run("(注1) 9,999"), Some("1"));
        assert_eq!(first_digit_run("なし"), None);
    }

    #[test]
    fn test_validate_run() {
        assert_eq!(validate_run("1,234", 4), Ok(1234));
        assert!(validate_run("999", 4).is_err());
        assert!(validate_run(",", 4).is_err());
        assert_eq!(validate_run("999", 3), Ok(999));
    }

    #[test]
    fn test_label_pattern() {
        assert_eq!(label_pattern("短 期 社 債"), r"短\s*期\s*社\s*債");
        assert_eq!(label_pattern("国債"), "国債");
    }

    #[test]
    fn test_short_term_note_does_not_leak_into_bond() {
        let text = "短 期 社 債 12,345\n社 債 67,890";
        let extraction = extract(text, &[]);

        assert_eq!(amount(&extraction, "short-term-note"), Amount::Value(12345));
        assert_eq!(amount(&extraction, "corporate-bond"), Amount::Value(67890));
    }

    #[test]
    fn test_bond_not_found_when_only_short_term_note_present() {
        let extraction = extract("短期社債 12,345", &[]);

        assert_eq!(amount(&extraction, "short-term-note"), Amount::Value(12345));
        assert_eq!(amount(&extraction, "corporate-bond"), Amount::NotFound);
    }

    #[test]
    fn test_unevenly_spaced_short_term_note_stays_out_of_bond() {
        for text in ["短期 社債 5,000", "短 期社債 5,000", "短期社 債 5,000"] {
            let extraction = extract(text, &[]);

            assert_eq!(amount(&extraction, "short-term-note"), Amount::Value(5000), "{}", text);
            assert_eq!(amount(&extraction, "corporate-bond"), Amount::NotFound, "{}", text);
        }
    }

    #[test]
    fn test_unevenly_spaced_short_term_note_in_table() {
        let table = TableGrid::from_cells(&[&["短期 社債", "5,000"], &["社 債", "7,000"]]);
        let extraction = extract("", &[table]);

        assert_eq!(amount(&extraction, "short-term-note"), Amount::Value(5000));
        assert_eq!(amount(&extraction, "corporate-bond"), Amount::Value(7000));
        assert_eq!(
            extraction.found_by("short-term-note"),
            Some(StrategyKind::TableScan)
        );
    }

    #[test]
    fn test_exclusion_patterns_ignore_spacing() {
        let exclusions = ExclusionPatterns::new(&CategoryCatalog::standard());

        assert_eq!(
            exclusions.find_in("corporate-bond", "短 期社債 5,000"),
            Some("短 期社債")
        );
        assert_eq!(exclusions.find_in("corporate-bond", "社 債 5,000"), None);
        assert!(exclusions.patterns("equity").is_empty());
    }

    #[test]
    fn test_empty_input_is_all_not_found() {
        let extraction = extract("", &[]);

        assert_eq!(extraction.amounts.len(), 7);
        assert_eq!(extraction.amounts.found_count(), 0);
        assert!(extraction.found_by.is_empty());
    }

    #[test]
    fn test_short_numbers_rejected() {
        let extraction = extract("国 債 123\n株 式 (2) 4,500", &[]);

        assert_eq!(amount(&extraction, "government-bond"), Amount::NotFound);
        assert_eq!(amount(&extraction, "equity"), Amount::NotFound);
    }

    #[test]
    fn test_line_scan_finds_all_categories() {
        let text = "\
2025年3月中平残
国 債 1,234,567
地 方 債 234,567
短 期 社 債 3,456
社 債 456,789
株 式 56,789
外 国 証 券 678,901
そ の 他 の 証 券 78,901";
        let extraction = extract(text, &[]);

        assert_eq!(amount(&extraction, "government-bond"), Amount::Value(1234567));
        assert_eq!(amount(&extraction, "municipal-bond"), Amount::Value(234567));
        assert_eq!(amount(&extraction, "short-term-note"), Amount::Value(3456));
        assert_eq!(amount(&extraction, "corporate-bond"), Amount::Value(456789));
        assert_eq!(amount(&extraction, "equity"), Amount::Value(56789));
        assert_eq!(amount(&extraction, "foreign-securities"), Amount::Value(678901));
        assert_eq!(amount(&extraction, "other-securities"), Amount::Value(78901));
        assert!(extraction
            .found_by
            .iter()
            .all(|(_, kind)| *kind == StrategyKind::LineScan));
    }

    #[test]
    fn test_pattern_scan_tolerates_spacing() {
        // Double spaces defeat the literal aliases
        let extraction = extract("社  債  67,890", &[]);

        assert_eq!(amount(&extraction, "corporate-bond"), Amount::Value(67890));
        assert_eq!(
            extraction.found_by("corporate-bond"),
            Some(StrategyKind::PatternScan)
        );
    }

    #[test]
    fn test_pattern_scan_crosses_line_break() {
        let extraction = extract("地 方 債\n 98,765", &[]);

        assert_eq!(amount(&extraction, "municipal-bond"), Amount::Value(98765));
        assert_eq!(
            extraction.found_by("municipal-bond"),
            Some(StrategyKind::PatternScan)
        );
    }

    #[test]
    fn test_pattern_scan_respects_exclusion() {
        // Irregular spacing so only the pattern tier can see either label
        let extraction = extract("短  期  社  債  12,345", &[]);

        assert_eq!(amount(&extraction, "short-term-note"), Amount::Value(12345));
        assert_eq!(amount(&extraction, "corporate-bond"), Amount::NotFound);
    }

    #[test]
    fn test_table_scan_fallback() {
        let table = TableGrid::from_cells(&[
            &["国債", "", "1,234,567"],
            &["短期社債", "5,000"],
            &["社債", "(1)", "9,876"],
        ]);
        let extraction = extract("", &[table]);

        assert_eq!(amount(&extraction, "government-bond"), Amount::Value(1234567));
        assert_eq!(amount(&extraction, "short-term-note"), Amount::Value(5000));
        assert_eq!(amount(&extraction, "corporate-bond"), Amount::Value(9876));
        assert_eq!(
            extraction.found_by("corporate-bond"),
            Some(StrategyKind::TableScan)
        );
    }

    #[test]
    fn test_text_wins_over_table() {
        let table = TableGrid::from_cells(&[&["株式", "11,111"]]);
        let extraction = extract("株 式 22,222", &[table]);

        assert_eq!(amount(&extraction, "equity"), Amount::Value(22222));
    }

    #[test]
    fn test_diagnostics_trace_decisions() {
        let extraction = extract("短 期 社 債 12,345\n社 債 67,890", &[]);

        assert!(extraction
            .diagnostics
            .iter()
            .any(|d| d.contains("skip line 1 for corporate-bond")));
        assert!(extraction
            .diagnostics
            .iter()
            .any(|d| d.contains("accepted corporate-bond = 67890")));
    }

    #[test]
    fn test_custom_min_digits() {
        let extractor = FieldExtractor::default().with_min_digits(2);
        let extraction = extractor.extract("国 債 123", &[]);

        assert_eq!(amount(&extraction, "government-bond"), Amount::Value(123));
    }

    #[test]
    fn test_declared_exclusion_pair() {
        let catalog = CategoryCatalog::new(vec![
            Category::new("foreign-securities", "外国証券", &["外国証券"]),
            Category::new("securities", "証券", &["証券"]).excluded_by("foreign-securities"),
        ])
        .unwrap();
        let extractor = FieldExtractor::new(catalog);
        let extraction = extractor.extract("外国証券 5,555\n証券 7,777", &[]);

        assert_eq!(amount(&extraction, "foreign-securities"), Amount::Value(5555));
        assert_eq!(amount(&extraction, "securities"), Amount::Value(7777));
    }
}
