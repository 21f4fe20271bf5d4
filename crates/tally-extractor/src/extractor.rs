//! Core page extraction implementation

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse_model_response;
use crate::prompt::{PromptBuilder, EXTRACT_SYSTEM};
use crate::types::{ExtractionReport, PageContext};
use std::sync::Arc;
use tally_llm::ModelProvider;
use tokio::time::timeout;
use tracing::{debug, info};

/// Extracts candidate records from one transcribed page
pub struct PageExtractor<M: ModelProvider> {
    provider: Arc<M>,
    config: ExtractorConfig,
}

impl<M: ModelProvider> PageExtractor<M> {
    /// Create a new page extractor
    pub fn new(provider: Arc<M>, config: ExtractorConfig) -> Self {
        Self { provider, config }
    }

    /// The extractor's configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract candidates from a page's transcription
    ///
    /// An empty candidate list is normal for non-transactional pages. The
    /// error cases - timeout, model failure, unusable or ambiguous response
    /// - all mean the page could not be extracted and map to a page-level
    /// parse failure upstream.
    pub async fn extract_page(
        &self,
        context: &PageContext,
        page_text: &str,
    ) -> Result<ExtractionReport, ExtractorError> {
        if page_text.len() > self.config.max_text_length {
            return Err(ExtractorError::TextTooLong(
                page_text.len(),
                self.config.max_text_length,
            ));
        }

        let prompt = PromptBuilder::new(context, page_text).build();
        debug!("extraction prompt: {} chars", prompt.len());

        let response = timeout(
            self.config.extraction_timeout(),
            self.provider.complete(EXTRACT_SYSTEM, &prompt),
        )
        .await
        .map_err(|_| ExtractorError::Timeout)?
        .map_err(|e| ExtractorError::Model(e.to_string()))?;

        debug!("extraction response: {} chars", response.len());

        let report = parse_model_response(&response)?;

        info!(
            "extracted {}/p{}: {} candidates, {} skipped",
            context.doc_id,
            context.page_id,
            report.candidates.len(),
            report.skipped.len()
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_llm::MockProvider;

    fn context() -> PageContext {
        PageContext::unclassified("1704", 1)
    }

    #[tokio::test]
    async fn test_extract_page_happy_path() {
        let provider = Arc::new(MockProvider::new().with_default_completion(
            r#"{"rows": [{"description": "To cash", "transaction_type": "Debit", "pounds": 1}]}"#,
        ));
        let extractor = PageExtractor::new(provider.clone(), ExtractorConfig::default());

        let report = extractor
            .extract_page(&context(), "To cash  £1")
            .await
            .unwrap();
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].transaction_type, "Debit");
        assert_eq!(provider.complete_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_yields_no_candidates() {
        let provider =
            Arc::new(MockProvider::new().with_default_completion(r#"{"rows": []}"#));
        let extractor = PageExtractor::new(provider, ExtractorConfig::default());

        let report = extractor.extract_page(&context(), "blank").await.unwrap();
        assert!(report.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_model_error_surfaces() {
        let provider = Arc::new(MockProvider::new().with_failing_prompt("Document: 1704"));
        let extractor = PageExtractor::new(provider, ExtractorConfig::default());

        let err = extractor.extract_page(&context(), "text").await.unwrap_err();
        assert!(matches!(err, ExtractorError::Model(_)));
    }

    #[tokio::test]
    async fn test_text_too_long() {
        let provider = Arc::new(MockProvider::new().with_default_completion("{}"));
        let config = ExtractorConfig {
            max_text_length: 10,
            ..ExtractorConfig::default()
        };
        let extractor = PageExtractor::new(provider, config);

        let err = extractor
            .extract_page(&context(), "a page text longer than ten characters")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractorError::TextTooLong(_, 10)));
    }

    #[tokio::test]
    async fn test_unusable_response_is_error() {
        let provider = Arc::new(MockProvider::new().with_default_completion("no json here"));
        let extractor = PageExtractor::new(provider, ExtractorConfig::default());

        let err = extractor.extract_page(&context(), "text").await.unwrap_err();
        assert!(matches!(err, ExtractorError::InvalidFormat(_)));
    }
}
