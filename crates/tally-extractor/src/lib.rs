//! Tally Extractor
//!
//! Converts transcribed ledger pages into candidate records.
//!
//! # Overview
//!
//! The extractor is the structured half of the model pipeline: given a
//! page's plain-text transcription it classifies the page, prompts the
//! model for row-level extraction, and parses the JSON reply into typed
//! [`RecordCandidate`](tally_domain::RecordCandidate)s with per-field model
//! confidences. Every row parse is a tagged outcome - a candidate or a
//! recorded failure - never an untyped map consumed ad hoc.
//!
//! # Architecture
//!
//! ```text
//! Transcription → Classifier → PromptBuilder → Model → Parser → Candidates
//! ```
//!
//! Validation and scoring happen downstream; the extractor reports what the
//! model claims, faithfully.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tally_extractor::{ExtractorConfig, PageContext, PageExtractor};
//! use tally_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(MockProvider::new().with_default_completion("{\"rows\": []}"));
//! let extractor = PageExtractor::new(provider, ExtractorConfig::default());
//!
//! let context = PageContext::unclassified("1704", 1);
//! let report = extractor.extract_page(&context, "Receipts for the year...").await?;
//!
//! println!("{} candidates", report.candidates.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod classifier;
mod config;
mod error;
mod extractor;
mod parser;
mod prompt;
mod types;

pub use classifier::PageClassifier;
pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::PageExtractor;
pub use parser::parse_model_response;
pub use prompt::PromptBuilder;
pub use types::{ExtractionReport, PageClassification, PageContext, RowFailure};
