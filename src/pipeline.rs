// 🏗️ Document Pipeline - Statement page → extraction → confirmed ledger record

use crate::amount::{Amount, ExtractionResult};
use crate::catalog::CategoryCatalog;
use crate::config::Config;
use crate::document::Document;
use crate::error::{CatalogError, InputError};
use crate::extractor::{FieldExtractor, StrategyKind};
use crate::ledger::PeriodRecord;
use crate::period::{extract_period_key, PeriodKey};
use tracing::info;

/// Result for the most recently processed document
#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    /// `None` when the page carries no recognizable year-month
    pub period: Option<PeriodKey>,
    pub amounts: ExtractionResult,
    pub found_by: Vec<(String, StrategyKind)>,
    pub diagnostics: Vec<String>,
}

impl DocumentExtraction {
    /// Confirm the extraction as a ledger record.
    ///
    /// `period_override` replaces the detected period; `corrections` replace
    /// individual amounts by category name.
    pub fn into_record(
        self,
        period_override: Option<PeriodKey>,
        corrections: &[(&str, Amount)],
    ) -> Result<PeriodRecord, InputError> {
        let period = period_override
            .or(self.period)
            .ok_or(InputError::UnknownPeriod)?;

        let mut amounts = self.amounts;
        for (category, amount) in corrections {
            if !amounts.set(category, *amount) {
                return Err(InputError::UnknownCategory(category.to_string()));
            }
        }

        Ok(PeriodRecord::new(period, amounts))
    }
}

pub struct Pipeline {
    extractor: FieldExtractor,
    statement_page: usize,
}

impl Pipeline {
    pub fn new(extractor: FieldExtractor, statement_page: usize) -> Self {
        Pipeline {
            extractor,
            statement_page,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        let extractor =
            FieldExtractor::new(config.catalog()?).with_min_digits(config.min_amount_digits);
        Ok(Pipeline::new(extractor, config.statement_page))
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        self.extractor.catalog()
    }

    pub fn statement_page(&self) -> usize {
        self.statement_page
    }

    /// Extract period and amounts from the statement page.
    ///
    /// A missing page or a page with neither text nor table rows is unusable
    /// input; no partial extraction is attempted.
    pub fn process_document(&self, document: &Document) -> Result<DocumentExtraction, InputError> {
        let page = document
            .page(self.statement_page)
            .ok_or(InputError::MissingPage {
                requested: self.statement_page,
                available: document.page_count(),
            })?;

        if page.is_blank() {
            return Err(InputError::EmptyPage {
                index: self.statement_page,
            });
        }

        let period = extract_period_key(&page.text);
        let extraction = self.extractor.extract(&page.text, &page.tables);

        let mut diagnostics = vec![format!(
            "page {}: {} line(s), {} table(s), period {}",
            self.statement_page,
            page.text.lines().count(),
            page.tables.len(),
            period.as_ref().map(PeriodKey::as_str).unwrap_or("unknown")
        )];
        diagnostics.extend(extraction.diagnostics);

        info!(
            period = period.as_ref().map(PeriodKey::as_str).unwrap_or("unknown"),
            found = extraction.amounts.found_count(),
            "Processed statement page"
        );

        Ok(DocumentExtraction {
            period,
            amounts: extraction.amounts,
            found_by: extraction.found_by,
            diagnostics,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new(FieldExtractor::default(), Config::default().statement_page)
    }
}
