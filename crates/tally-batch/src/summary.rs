//! Run-level counters and the end-of-batch report

use serde::Serialize;
use tally_domain::{ConfidenceStats, PageStatus};

/// Counters collected over one batch run
///
/// Returned to the caller alongside the dataset; also rendered as a
/// human-readable report at the end of the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Documents discovered and attempted
    pub documents: usize,

    /// Documents whose page conversion failed outright
    pub documents_failed: usize,

    /// Pages that transcribed and extracted normally
    pub pages_processed: usize,

    /// Pages that failed transcription after exhausting retries
    pub pages_failed_ocr: usize,

    /// Pages whose transcription could not be parsed into rows
    pub pages_failed_parse: usize,

    /// Records produced across all pages
    pub records_produced: usize,

    /// The run was stopped early by the clean-stop signal
    pub stopped_early: bool,

    /// Distribution of final confidences, absent when no records
    pub confidence: Option<ConfidenceStats>,
}

impl RunSummary {
    /// Create new empty counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document being attempted
    pub fn record_document(&mut self) {
        self.documents += 1;
    }

    /// Record a document whose conversion failed
    pub fn record_document_failure(&mut self) {
        self.documents_failed += 1;
    }

    /// Record a page outcome and its record count
    pub fn record_page(&mut self, status: PageStatus, records: usize) {
        match status {
            PageStatus::Ok => {
                self.pages_processed += 1;
                self.records_produced += records;
            }
            PageStatus::OcrFailed => self.pages_failed_ocr += 1,
            PageStatus::ParseFailed => self.pages_failed_parse += 1,
        }
    }

    /// Total failed pages across both failure kinds
    pub fn pages_failed(&self) -> usize {
        self.pages_failed_ocr + self.pages_failed_parse
    }

    /// Total pages seen
    pub fn pages_seen(&self) -> usize {
        self.pages_processed + self.pages_failed()
    }

    /// Generate a human-readable report
    pub fn report(&self) -> String {
        let mut lines = vec![
            "Batch Run Summary".to_string(),
            "=================".to_string(),
            format!("Documents: {} ({} failed)", self.documents, self.documents_failed),
            format!(
                "Pages: {} processed, {} ocr_failed, {} parse_failed",
                self.pages_processed, self.pages_failed_ocr, self.pages_failed_parse
            ),
            format!("Records: {}", self.records_produced),
        ];

        if let Some(stats) = &self.confidence {
            lines.push(format!(
                "Confidence: mean {:.3}, median {:.3}, min {:.3}",
                stats.mean, stats.median, stats.min
            ));
        }

        if self.stopped_early {
            lines.push("Stopped early by request".to_string());
        }

        lines.join("\n")
    }
}
