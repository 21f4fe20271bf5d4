//! The batch orchestrator

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::summary::RunSummary;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tally_domain::traits::{PageConverter, TranscriptCache};
use tally_domain::{
    ConsolidatedDataset, LedgerRecord, PageImage, PageKey, PageMeta, PageStatus, PageType,
    RecordCandidate, TransactionType,
};
use tally_extractor::{PageClassification, PageClassifier, PageContext, PageExtractor};
use tally_gatekeeper::SchemaValidator;
use tally_llm::ModelProvider;
use tally_store::PageCache;
use tracing::{error, info, warn};

/// A source document discovered in the input directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    /// Identifier derived from the filename stem
    pub doc_id: String,
    /// Path of the source file
    pub path: PathBuf,
}

/// Scan the input directory for source documents
///
/// Returns documents sorted by `doc_id`. An unreadable directory or a
/// directory with no matching files is the one fatal condition of a batch.
pub fn discover_documents(
    input_dir: &Path,
    extension: &str,
) -> Result<Vec<DocumentSource>, BatchError> {
    let mut documents = Vec::new();

    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !matches {
            continue;
        }
        if let Some(doc_id) = path.file_stem().and_then(|s| s.to_str()) {
            documents.push(DocumentSource {
                doc_id: doc_id.to_string(),
                path: path.clone(),
            });
        }
    }

    documents.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));

    if documents.is_empty() {
        return Err(BatchError::NoDocuments(input_dir.to_path_buf()));
    }

    Ok(documents)
}

/// Output of one batch run
#[derive(Debug)]
pub struct BatchRun {
    /// The two consolidated output relations
    pub dataset: ConsolidatedDataset,
    /// Run-level counters and confidence statistics
    pub summary: RunSummary,
}

/// Drives documents and pages through transcription, extraction,
/// validation, and scoring into the consolidated dataset
pub struct BatchOrchestrator<M, C, S>
where
    M: ModelProvider,
    C: PageConverter,
    S: TranscriptCache,
{
    provider: Arc<M>,
    converter: C,
    cache: PageCache<S>,
    validator: SchemaValidator,
    classifier: PageClassifier<M>,
    extractor: PageExtractor<M>,
    config: BatchConfig,
    stop: Arc<AtomicBool>,
}

impl<M, C, S> BatchOrchestrator<M, C, S>
where
    M: ModelProvider,
    C: PageConverter,
    S: TranscriptCache,
    C::Error: std::fmt::Display,
    S::Error: std::fmt::Display,
{
    /// Create a new orchestrator
    pub fn new(provider: Arc<M>, converter: C, store: S, config: BatchConfig) -> Self {
        let cache = PageCache::new(store).with_force_refresh(config.force_refresh);
        let validator = SchemaValidator::new(config.validation.clone());
        let classifier = PageClassifier::new(Arc::clone(&provider));
        let extractor = PageExtractor::new(Arc::clone(&provider), config.extractor.clone());

        Self {
            provider,
            converter,
            cache,
            validator,
            classifier,
            extractor,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A shared flag that requests a clean stop
    ///
    /// Honored between pages and between documents; the page in flight
    /// finishes first, so cache and partial output stay consistent.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Consume the orchestrator, returning the transcript store for the
    /// caller's flush/close lifecycle
    pub fn into_store(self) -> S {
        self.cache.into_store()
    }

    /// Run the batch to completion
    pub async fn run(&mut self) -> Result<BatchRun, BatchError> {
        self.config.validate().map_err(BatchError::Config)?;

        let documents =
            discover_documents(&self.config.input_dir, &self.config.document_extension)?;
        info!(
            "discovered {} documents in {}",
            documents.len(),
            self.config.input_dir.display()
        );

        let mut dataset = ConsolidatedDataset::new();
        let mut summary = RunSummary::new();

        'documents: for doc in &documents {
            if self.stop.load(Ordering::Relaxed) {
                info!("stop requested, ending run before {}", doc.doc_id);
                summary.stopped_early = true;
                break;
            }

            info!("processing document {}", doc.doc_id);
            summary.record_document();

            let pages = match self.converter.pages(&doc.path) {
                Ok(pages) => pages,
                Err(e) => {
                    error!("page conversion failed for {}: {}", doc.doc_id, e);
                    summary.record_document_failure();
                    continue;
                }
            };

            for image in &pages {
                if self.stop.load(Ordering::Relaxed) {
                    info!("stop requested, ending run at {}/p{}", doc.doc_id, image.page_id);
                    summary.stopped_early = true;
                    break 'documents;
                }

                let key = PageKey::new(doc.doc_id.clone(), image.page_id);
                self.process_page(&key, image, &mut dataset, &mut summary)
                    .await?;
            }
        }

        summary.confidence = dataset.confidence_stats();
        info!("{}", summary.report());

        Ok(BatchRun { dataset, summary })
    }

    /// Process one page end to end
    ///
    /// Page-level failures are recorded in the dataset and summary, never
    /// returned: the `Err` path is reserved for dataset invariant breaks.
    async fn process_page(
        &mut self,
        key: &PageKey,
        image: &PageImage,
        dataset: &mut ConsolidatedDataset,
        summary: &mut RunSummary,
    ) -> Result<(), BatchError> {
        // a forced refresh hands the model the prior transcription to
        // correct instead of starting blind
        let prior = if self.cache.force_refresh() {
            self.cache.cached(key)
        } else {
            None
        };

        let provider = Arc::clone(&self.provider);
        let image_path = image.path.clone();
        let transcription = self
            .cache
            .get_or_compute(key, || async move {
                provider.transcribe(&image_path, prior.as_deref()).await
            })
            .await;

        let text = match transcription {
            Ok(text) => text,
            Err(e) => {
                error!("transcription failed for {}: {}", key, e);
                dataset.replace_page(PageMeta::failed(key, PageStatus::OcrFailed), Vec::new())?;
                summary.record_page(PageStatus::OcrFailed, 0);
                return Ok(());
            }
        };

        let classification = if self.config.extractor.classify_pages {
            self.classifier
                .classify(&key.doc_id, key.page_id, &text)
                .await
        } else {
            PageClassification {
                page_type: PageType::Unknown,
                structure_overview: String::new(),
            }
        };
        let context = PageContext::classified(key.doc_id.clone(), key.page_id, classification);

        let report = match self.extractor.extract_page(&context, &text).await {
            Ok(report) => report,
            Err(e) => {
                warn!("extraction failed for {}: {}", key, e);
                let meta = PageMeta {
                    doc_id: key.doc_id.clone(),
                    page_id: key.page_id,
                    page_type: context.page_type,
                    structure_overview: context.structure_overview,
                    status: PageStatus::ParseFailed,
                    row_count: 0,
                };
                dataset.replace_page(meta, Vec::new())?;
                summary.record_page(PageStatus::ParseFailed, 0);
                return Ok(());
            }
        };

        if !report.skipped.is_empty() {
            warn!("{} proposed rows skipped on {}", report.skipped.len(), key);
        }

        let records: Vec<LedgerRecord> = report
            .candidates
            .iter()
            .map(|candidate| self.finalize(key, candidate))
            .collect();
        let count = records.len();

        let meta = PageMeta {
            doc_id: key.doc_id.clone(),
            page_id: key.page_id,
            page_type: context.page_type,
            structure_overview: context.structure_overview,
            status: PageStatus::Ok,
            row_count: count,
        };
        dataset.replace_page(meta, records)?;
        summary.record_page(PageStatus::Ok, count);

        info!("page {} done: {} records", key, count);
        Ok(())
    }

    /// Validate and score one candidate into a finalized record
    fn finalize(&self, key: &PageKey, candidate: &RecordCandidate) -> LedgerRecord {
        let validation = self.validator.validate(candidate);
        let model_overall = self.config.scoring.model_confidence(&candidate.confidence);
        let final_confidence = self
            .config
            .scoring
            .blend(model_overall, validation.rule_confidence);

        LedgerRecord {
            doc_id: key.doc_id.clone(),
            page_id: key.page_id,
            row_id: candidate.row_id,
            description: candidate.description.clone(),
            transaction_type: candidate
                .resolved_type()
                .unwrap_or(TransactionType::Unknown),
            pounds: candidate.pounds,
            shillings: candidate.shillings,
            pence: candidate.pence,
            pence_fraction: candidate.resolved_fraction(),
            model_confidence: candidate.confidence,
            model_confidence_overall: model_overall,
            rule_confidence: validation.rule_confidence,
            final_confidence,
            violations: validation.rule_names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1712.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("1704.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("1799.pdf")).unwrap();

        let documents = discover_documents(dir.path(), "pdf").unwrap();
        let ids: Vec<&str> = documents.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["1704", "1712"]);
    }

    #[test]
    fn test_discovery_extension_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1704.PDF"), b"x").unwrap();

        let documents = discover_documents(dir.path(), "pdf").unwrap();
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn test_empty_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_documents(dir.path(), "pdf").unwrap_err();
        assert!(matches!(err, BatchError::NoDocuments(_)));
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let err = discover_documents(Path::new("/nonexistent/archive"), "pdf").unwrap_err();
        assert!(matches!(err, BatchError::Io(_)));
    }
}
