//! The consolidated two-relation output dataset

use crate::confidence::ConfidenceStats;
use crate::page::{PageKey, PageMeta};
use crate::record::LedgerRecord;
use std::collections::BTreeMap;
use std::fmt;

/// Referential-integrity errors raised by the dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    /// A record was appended for a page with no metadata row
    MissingPage {
        /// Offending page key
        key: PageKey,
    },
    /// Two records claimed the same `(doc_id, page_id, row_id)`
    DuplicateRow {
        /// Offending page key
        key: PageKey,
        /// Duplicated row ordinal
        row_id: u32,
    },
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPage { key } => {
                write!(f, "record references page {} with no metadata row", key)
            }
            Self::DuplicateRow { key, row_id } => {
                write!(f, "duplicate row {} on page {}", row_id, key)
            }
        }
    }
}

impl std::error::Error for DatasetError {}

/// The two output relations, referentially consistent and deterministically
/// ordered by `(doc_id, page_id, row_id)` / `(doc_id, page_id)`
///
/// Every record's `(doc_id, page_id)` must reference an existing metadata
/// row, so pages are registered before their records. Reprocessing a page
/// replaces its metadata row and all of its records wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidatedDataset {
    pages: BTreeMap<PageKey, PageMeta>,
    records: BTreeMap<(PageKey, u32), LedgerRecord>,
}

impl ConsolidatedDataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page's metadata row, replacing any prior row and
    /// dropping that page's existing records
    pub fn upsert_page(&mut self, meta: PageMeta) {
        let key = meta.key();
        let row_keys: Vec<(PageKey, u32)> = self
            .records
            .range((key.clone(), 0)..=(key.clone(), u32::MAX))
            .map(|(k, _)| k.clone())
            .collect();
        for row_key in row_keys {
            self.records.remove(&row_key);
        }
        self.pages.insert(key, meta);
    }

    /// Append one finalized record
    ///
    /// The record's page must already be registered and its row ordinal
    /// unused on that page.
    pub fn push_record(&mut self, record: LedgerRecord) -> Result<(), DatasetError> {
        let key = PageKey::new(record.doc_id.clone(), record.page_id);
        if !self.pages.contains_key(&key) {
            return Err(DatasetError::MissingPage { key });
        }
        let row_key = (key.clone(), record.row_id);
        if self.records.contains_key(&row_key) {
            return Err(DatasetError::DuplicateRow {
                key,
                row_id: record.row_id,
            });
        }
        self.records.insert(row_key, record);
        Ok(())
    }

    /// Replace a page's metadata and records in one step
    ///
    /// The metadata `row_count` is reconciled with the records actually
    /// accepted, so callers cannot desynchronize the two relations.
    pub fn replace_page(
        &mut self,
        mut meta: PageMeta,
        records: Vec<LedgerRecord>,
    ) -> Result<(), DatasetError> {
        meta.row_count = records.len();
        self.upsert_page(meta);
        for record in records {
            self.push_record(record)?;
        }
        Ok(())
    }

    /// Records in `(doc_id, page_id, row_id)` order
    pub fn records(&self) -> impl Iterator<Item = &LedgerRecord> {
        self.records.values()
    }

    /// Page metadata in `(doc_id, page_id)` order
    pub fn pages(&self) -> impl Iterator<Item = &PageMeta> {
        self.pages.values()
    }

    /// Metadata row for one page, if registered
    pub fn page(&self, key: &PageKey) -> Option<&PageMeta> {
        self.pages.get(key)
    }

    /// Number of records across all pages
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of registered pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Distribution statistics over final confidences, `None` when the
    /// records relation is empty
    pub fn confidence_stats(&self) -> Option<ConfidenceStats> {
        let scores: Vec<f64> = self.records.values().map(|r| r.final_confidence).collect();
        ConfidenceStats::from_scores(&scores)
    }

    /// Consume the dataset into ordered `(records, pages)` sequences ready
    /// for an export adapter
    pub fn into_relations(self) -> (Vec<LedgerRecord>, Vec<PageMeta>) {
        (
            self.records.into_values().collect(),
            self.pages.into_values().collect(),
        )
    }
}
