//! Request and response types for extraction

use tally_domain::{PageType, RecordCandidate};

/// Lightweight page context handed to the extraction prompt
#[derive(Debug, Clone, PartialEq)]
pub struct PageContext {
    /// Source document identifier
    pub doc_id: String,

    /// 1-based page ordinal
    pub page_id: u32,

    /// Semantic classification of the page
    pub page_type: PageType,

    /// Classifier's free-form description of the page's financial structure
    pub structure_overview: String,
}

impl PageContext {
    /// Context for a page that was not (or could not be) classified
    pub fn unclassified(doc_id: impl Into<String>, page_id: u32) -> Self {
        Self {
            doc_id: doc_id.into(),
            page_id,
            page_type: PageType::Unknown,
            structure_overview: String::new(),
        }
    }

    /// Context carrying a classification result
    pub fn classified(
        doc_id: impl Into<String>,
        page_id: u32,
        classification: PageClassification,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            page_id,
            page_type: classification.page_type,
            structure_overview: classification.structure_overview,
        }
    }
}

/// Result of classifying one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageClassification {
    /// Semantic page type
    pub page_type: PageType,

    /// Free-form description of the page's financial structure
    pub structure_overview: String,
}

/// A row the model proposed but that failed field parsing
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    /// Why the row was skipped
    pub reason: String,

    /// The offending row as raw JSON
    pub raw: String,
}

/// Result of extracting one page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractionReport {
    /// Successfully parsed candidates, in page order
    pub candidates: Vec<RecordCandidate>,

    /// Rows skipped during parsing, for the page's audit trail
    pub skipped: Vec<RowFailure>,
}
