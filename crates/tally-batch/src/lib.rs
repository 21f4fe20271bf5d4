//! Tally Batch Orchestrator
//!
//! Drives a whole batch of ledger documents through the pipeline:
//!
//! ```text
//! input dir → documents → pages → PageCache → transcription
//!            → classification → extraction → validation → scoring
//!            → ConsolidatedDataset + RunSummary
//! ```
//!
//! # Failure isolation
//!
//! No single page or document failure is fatal. A transcription failure
//! marks the page `ocr_failed`; an extraction failure marks it
//! `parse_failed`; both contribute zero records and the batch moves on.
//! The only fatal condition is an unusable input location.
//!
//! # Resumability
//!
//! Transcriptions are cached per page, so re-running a batch performs zero
//! transcription calls for pages cached by an earlier run and reproduces
//! the same relations. A clean-stop flag is honored between pages and
//! documents, leaving cache and partial output consistent.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tally_batch::{BatchConfig, BatchOrchestrator};
//! use tally_llm::{OpenAiProvider, RetryPolicy};
//! use tally_store::SqliteTranscriptStore;
//! # use std::path::Path;
//! # use tally_domain::traits::PageConverter;
//! # use tally_domain::PageImage;
//! # struct PdfConverter;
//! # impl PageConverter for PdfConverter {
//! #     type Error = std::io::Error;
//! #     fn pages(&self, _: &Path) -> Result<Vec<PageImage>, Self::Error> { Ok(vec![]) }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BatchConfig::default();
//! let provider = Arc::new(
//!     OpenAiProvider::default_endpoint(std::env::var("OPENAI_API_KEY")?, "gpt-4o-mini")
//!         .with_retry_policy(config.retry),
//! );
//! let store = SqliteTranscriptStore::new(&config.cache_path)?;
//!
//! let mut orchestrator = BatchOrchestrator::new(provider, PdfConverter, store, config);
//! let run = orchestrator.run().await?;
//!
//! println!("{}", run.summary.report());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod orchestrator;
mod summary;

pub use config::BatchConfig;
pub use error::BatchError;
pub use orchestrator::{discover_documents, BatchOrchestrator, BatchRun, DocumentSource};
pub use summary::RunSummary;
