// 📅 Period Keys - Normalized year-month identifiers
// "2025年3月中平残" → "2025-03". Zero padding makes lexicographic order chronological.

use crate::error::InputError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// ============================================================================
// PERIOD KEY
// ============================================================================

/// Reporting period, normally "YYYY-MM".
///
/// Ordering is plain string ordering, so keys must keep the zero-padded shape to
/// sort chronologically. `from_raw` accepts caller-confirmed keys without checking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Normalized key for a calendar month
    pub fn new(year: u32, month: u32) -> Option<Self> {
        if year > 9999 || !(1..=12).contains(&month) {
            return None;
        }
        Some(PeriodKey(format!("{:04}-{:02}", year, month)))
    }

    /// Take a key as-is (e.g. typed by a user in a correction form)
    pub fn from_raw(raw: &str) -> Self {
        PeriodKey(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// (year, month) if the key has the normalized shape
    pub fn year_month(&self) -> Option<(u32, u32)> {
        let (year, month) = self.0.split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: u32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        (1..=12).contains(&month).then_some((year, month))
    }

    pub fn is_normalized(&self) -> bool {
        self.year_month().is_some()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PeriodKey {
    type Err = InputError;

    /// Strict parse: "2025-03", "2025-3", "2025/03" or "2025年3月"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match extract_period_key(trimmed) {
            Some(key) if key_spans_whole(trimmed) => Ok(key),
            _ => Err(InputError::InvalidPeriod(s.to_string())),
        }
    }
}

fn key_spans_whole(s: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}\s*(?:年\s*\d{1,2}\s*月|[-/.]\s*\d{1,2})$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

// ============================================================================
// EXTRACTION
// ============================================================================

fn japanese_period_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)(\d{4})\s*年\s*(\d{1,2})\s*月").ok())
        .as_ref()
}

fn numeric_period_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)(\d{4})\s*[-/.]\s*(\d{1,2})(?:\D|$)").ok())
        .as_ref()
}

/// Find the first "<year><separator><month>" in page text.
///
/// The "年…月" form wins over numeric separators anywhere in the text. Months
/// outside 1-12 are skipped. Never fails; `None` means unknown.
pub fn extract_period_key(text: &str) -> Option<PeriodKey> {
    [japanese_period_re(), numeric_period_re()]
        .into_iter()
        .flatten()
        .find_map(|re| {
            re.captures_iter(text).find_map(|caps| {
                let year: u32 = caps.get(1)?.as_str().parse().ok()?;
                let month: u32 = caps.get(2)?.as_str().parse().ok()?;
                PeriodKey::new(year, month)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_japanese_period() {
        let key = extract_period_key("地方銀行主要勘定\n2025年3月中平残\n(単位:億円)");
        assert_eq!(key.unwrap().as_str(), "2025-03");
    }

    #[test]
    fn test_extract_spaced_japanese_period() {
        let key = extract_period_key("2024年 12 月末残高");
        assert_eq!(key.unwrap().as_str(), "2024-12");
    }

    #[test]
    fn test_extract_numeric_period() {
        assert_eq!(extract_period_key("as of 2025/4").unwrap().as_str(), "2025-04");
        assert_eq!(extract_period_key("2025-03-31").unwrap().as_str(), "2025-03");
    }

    #[test]
    fn test_japanese_form_preferred() {
        let key = extract_period_key("printed 2026/01\n2025年3月中平残");
        assert_eq!(key.unwrap().as_str(), "2025-03");
    }

    #[test]
    fn test_invalid_month_skipped() {
        assert!(extract_period_key("2025年13月").is_none());
        assert_eq!(
            extract_period_key("2025年13月 2025年11月").unwrap().as_str(),
            "2025-11"
        );
    }

    #[test]
    fn test_no_period() {
        assert!(extract_period_key("").is_none());
        assert!(extract_period_key("国 債 12,345").is_none());
    }

    #[test]
    fn test_ordering_is_chronological() {
        let march = PeriodKey::new(2025, 3).unwrap();
        let october = PeriodKey::new(2025, 10).unwrap();
        let last_year = PeriodKey::new(2024, 12).unwrap();
        assert!(last_year < march);
        assert!(march < october);
    }

    #[test]
    fn test_from_raw_is_unchecked() {
        let key = PeriodKey::from_raw(" 2025-3 ");
        assert_eq!(key.as_str(), "2025-3");
        assert!(!key.is_normalized());
        assert!(PeriodKey::from_raw("2025-03").is_normalized());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("2025-3".parse::<PeriodKey>().unwrap().as_str(), "2025-03");
        assert_eq!("2025年3月".parse::<PeriodKey>().unwrap().as_str(), "2025-03");
        assert!("March 2025".parse::<PeriodKey>().is_err());
        assert!("2025-03 extra".parse::<PeriodKey>().is_err());
    }
}
