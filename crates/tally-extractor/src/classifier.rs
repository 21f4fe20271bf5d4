//! Page classification with heuristic fallback

use crate::prompt::{classification_prompt, CLASSIFY_SYSTEM};
use crate::types::PageClassification;
use serde_json::Value;
use std::sync::Arc;
use tally_domain::PageType;
use tally_llm::ModelProvider;
use tracing::{debug, warn};

/// Classifies pages ahead of row extraction
///
/// Classification never fails a page: when the model call or its JSON
/// cannot be used, a keyword heuristic fills in, clearly labeled as such in
/// the structure overview.
pub struct PageClassifier<M: ModelProvider> {
    provider: Arc<M>,
}

impl<M: ModelProvider> PageClassifier<M> {
    /// Create a new classifier
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }

    /// Classify one transcribed page
    pub async fn classify(
        &self,
        doc_id: &str,
        page_id: u32,
        page_text: &str,
    ) -> PageClassification {
        let prompt = classification_prompt(doc_id, page_id, page_text);

        match self.provider.complete(CLASSIFY_SYSTEM, &prompt).await {
            Ok(response) => match parse_classification(&response) {
                Some(classification) => {
                    debug!(
                        "classified {}/p{} as {}",
                        doc_id, page_id, classification.page_type
                    );
                    classification
                }
                None => {
                    warn!(
                        "unusable classification response for {}/p{}, using heuristic",
                        doc_id, page_id
                    );
                    heuristic_classification(page_text)
                }
            },
            Err(e) => {
                warn!(
                    "classification call failed for {}/p{}: {}, using heuristic",
                    doc_id, page_id, e
                );
                heuristic_classification(page_text)
            }
        }
    }
}

/// Parse the classifier's JSON reply
fn parse_classification(response: &str) -> Option<PageClassification> {
    let json: Value = serde_json::from_str(response.trim()).ok()?;
    let obj = json.as_object()?;

    let page_type = obj
        .get("page_type")
        .and_then(|v| v.as_str())
        .and_then(PageType::parse)
        .unwrap_or(PageType::Unknown);

    let structure_overview = obj
        .get("financial_structure_overview")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Some(PageClassification {
        page_type,
        structure_overview,
    })
}

/// Keyword fallback when the model cannot be consulted
fn heuristic_classification(page_text: &str) -> PageClassification {
    let normalized = page_text.to_lowercase();

    if normalized.contains("total") || normalized.contains("balance") {
        PageClassification {
            page_type: PageType::FullBalanceSheet,
            structure_overview: "Fallback: classified as balance/summary page based on \
                 presence of 'total' or 'balance'."
                .to_string(),
        }
    } else {
        PageClassification {
            page_type: PageType::SectionalList,
            structure_overview: "Fallback: classified as list page using simple keyword \
                 heuristic."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_llm::MockProvider;

    #[tokio::test]
    async fn test_classification_from_model() {
        let provider = Arc::new(MockProvider::new().with_default_completion(
            r#"{"page_type": "Full_Balance_Sheet", "financial_structure_overview": "Year-end totals"}"#,
        ));
        let classifier = PageClassifier::new(provider);

        let c = classifier.classify("1704", 1, "The whole accompt").await;
        assert_eq!(c.page_type, PageType::FullBalanceSheet);
        assert_eq!(c.structure_overview, "Year-end totals");
    }

    #[tokio::test]
    async fn test_unknown_token_degrades_to_unknown() {
        let provider = Arc::new(
            MockProvider::new()
                .with_default_completion(r#"{"page_type": "Inventory", "financial_structure_overview": "x"}"#),
        );
        let classifier = PageClassifier::new(provider);

        let c = classifier.classify("1704", 1, "goods and chattels").await;
        assert_eq!(c.page_type, PageType::Unknown);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_heuristic() {
        let provider = Arc::new(MockProvider::new().with_failing_prompt("Document: 1704"));
        let classifier = PageClassifier::new(provider);

        let summary = classifier
            .classify("1704", 1, "The total of disbursements")
            .await;
        assert_eq!(summary.page_type, PageType::FullBalanceSheet);
        assert!(summary.structure_overview.starts_with("Fallback:"));

        let list = classifier
            .classify("1704", 2, "Received of Mr Hale 3s")
            .await;
        assert_eq!(list.page_type, PageType::SectionalList);
    }

    #[tokio::test]
    async fn test_garbled_response_falls_back() {
        let provider =
            Arc::new(MockProvider::new().with_default_completion("certainly! here is my answer"));
        let classifier = PageClassifier::new(provider);

        let c = classifier.classify("1704", 1, "Received of Mr Hale").await;
        assert_eq!(c.page_type, PageType::SectionalList);
        assert!(c.structure_overview.starts_with("Fallback:"));
    }
}
