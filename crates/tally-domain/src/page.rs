//! Page-level types: keys, classification, and processing status

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Unique key for a page within a batch: `(doc_id, page_id)`
///
/// Orders first by document then by page ordinal, which gives the dataset
/// and the transcript cache their deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageKey {
    /// Source document identifier
    pub doc_id: String,
    /// 1-based page ordinal
    pub page_id: u32,
}

impl PageKey {
    /// Create a new page key
    pub fn new(doc_id: impl Into<String>, page_id: u32) -> Self {
        Self {
            doc_id: doc_id.into(),
            page_id,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/p{}", self.doc_id, self.page_id)
    }
}

/// A rendered page image produced by the page-conversion collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based page ordinal within the document
    pub page_id: u32,
    /// Path to the rendered image on disk
    pub path: PathBuf,
}

/// Semantic classification of a ledger page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageType {
    /// Summary page carrying balances and totals
    #[serde(rename = "Full_Balance_Sheet")]
    FullBalanceSheet,
    /// Page listing individual transactions
    #[serde(rename = "Sectional_List")]
    SectionalList,
    /// Classification could not be determined
    #[default]
    Unknown,
}

impl PageType {
    /// Parse the classifier's page-type token
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "Full_Balance_Sheet" => Some(Self::FullBalanceSheet),
            "Sectional_List" => Some(Self::SectionalList),
            "Unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Canonical token as emitted by the classifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullBalanceSheet => "Full_Balance_Sheet",
            Self::SectionalList => "Sectional_List",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing outcome for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Page transcribed and extracted normally
    Ok,
    /// Transcription failed after exhausting retries
    OcrFailed,
    /// Transcription succeeded but no structured rows could be parsed
    ParseFailed,
}

impl PageStatus {
    /// Stable status token used in the page-metadata relation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::OcrFailed => "ocr_failed",
            Self::ParseFailed => "parse_failed",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the page-metadata relation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMeta {
    /// Source document identifier
    pub doc_id: String,
    /// 1-based page ordinal
    pub page_id: u32,
    /// Semantic classification
    pub page_type: PageType,
    /// Free-form description of the page's financial structure, produced
    /// by the classifier
    pub structure_overview: String,
    /// Processing outcome
    pub status: PageStatus,
    /// Number of records extracted from this page
    pub row_count: usize,
}

impl PageMeta {
    /// The page's unique key
    pub fn key(&self) -> PageKey {
        PageKey::new(self.doc_id.clone(), self.page_id)
    }

    /// Metadata row for a page that failed before producing any records
    pub fn failed(key: &PageKey, status: PageStatus) -> Self {
        Self {
            doc_id: key.doc_id.clone(),
            page_id: key.page_id,
            page_type: PageType::Unknown,
            structure_overview: String::new(),
            status,
            row_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_key_ordering() {
        let a1 = PageKey::new("1704", 1);
        let a2 = PageKey::new("1704", 2);
        let b1 = PageKey::new("1712", 1);
        assert!(a1 < a2);
        assert!(a2 < b1);
    }

    #[test]
    fn test_page_type_tokens() {
        assert_eq!(PageType::parse("Full_Balance_Sheet"), Some(PageType::FullBalanceSheet));
        assert_eq!(PageType::parse("Sectional_List"), Some(PageType::SectionalList));
        assert_eq!(PageType::parse("Unknown"), Some(PageType::Unknown));
        assert_eq!(PageType::parse("balance sheet"), None);
        assert_eq!(PageType::SectionalList.as_str(), "Sectional_List");
    }

    #[test]
    fn test_status_tokens() {
        assert_eq!(PageStatus::Ok.as_str(), "ok");
        assert_eq!(PageStatus::OcrFailed.as_str(), "ocr_failed");
        assert_eq!(PageStatus::ParseFailed.as_str(), "parse_failed");
    }

    #[test]
    fn test_failed_meta() {
        let key = PageKey::new("1704", 3);
        let meta = PageMeta::failed(&key, PageStatus::OcrFailed);
        assert_eq!(meta.key(), key);
        assert_eq!(meta.status, PageStatus::OcrFailed);
        assert_eq!(meta.row_count, 0);
        assert_eq!(meta.page_type, PageType::Unknown);
    }
}
