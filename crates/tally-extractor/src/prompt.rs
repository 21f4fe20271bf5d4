//! Model prompt engineering for classification and extraction

use crate::types::PageContext;

/// System message for the classification call
pub(crate) const CLASSIFY_SYSTEM: &str = "You are a precise assistant that classifies historical \
     ledger pages and must respond with STRICT JSON only.";

/// System message for the extraction call
pub(crate) const EXTRACT_SYSTEM: &str = "You are a precise assistant that extracts structured \
     ledger entries and must respond with STRICT JSON only.";

const CLASSIFY_INSTRUCTIONS: &str = r#"Classify the following transcribed ledger page.

Respond with a JSON object of this shape:

{
  "page_type": "Full_Balance_Sheet" | "Sectional_List" | "Unknown",
  "financial_structure_overview": "one or two sentences describing how the page is organized"
}

- "Full_Balance_Sheet": a summary page carrying balances and totals
- "Sectional_List": a page listing individual transactions
- "Unknown": neither, or not determinable"#;

const EXTRACT_INSTRUCTIONS: &str = r#"Extract every transaction row from the following transcribed ledger page.

Respond with a JSON object of this shape:

{
  "rows": [
    {
      "row_id": 0,
      "description": "text of the entry",
      "transaction_type": "Credit" | "Debit" | "Unknown",
      "pounds": integer or null,
      "shillings": integer or null,
      "pence": integer or null,
      "pence_fraction": "1/4" | "1/2" | "3/4" | "q" | "ob" | null,
      "model_conf_description": 0.0-1.0,
      "model_conf_transaction_type": 0.0-1.0,
      "model_conf_pounds": 0.0-1.0,
      "model_conf_shillings": 0.0-1.0,
      "model_conf_pence": 0.0-1.0,
      "model_conf_pence_fraction": 0.0-1.0
    }
  ]
}

Rules:
- One object per transaction line; number rows from 0 in page order
- Amounts are pre-decimal: pounds, shillings (0-19), pence (0-11)
- Use null for amounts that are not legible, never 0 as a guess
- "Unknown" is the correct transaction_type when the page does not mark direction
- The model_conf_* fields are your own certainty about each field
- Return {"rows": []} for a page with no transaction rows"#;

/// Builds the extraction prompt for one page
pub struct PromptBuilder<'a> {
    context: &'a PageContext,
    page_text: &'a str,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(context: &'a PageContext, page_text: &'a str) -> Self {
        Self { context, page_text }
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(EXTRACT_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str(&format!("Document: {}\n", self.context.doc_id));
        prompt.push_str(&format!("Page: {}\n", self.context.page_id));
        prompt.push_str(&format!("Page type: {}\n", self.context.page_type));
        if !self.context.structure_overview.is_empty() {
            prompt.push_str(&format!(
                "Structure: {}\n",
                self.context.structure_overview
            ));
        }
        prompt.push('\n');

        prompt.push_str("Page text:\n");
        prompt.push_str("---\n");
        prompt.push_str(self.page_text);
        prompt.push_str("\n---\n");

        prompt
    }
}

/// Build the classification prompt for one page
pub(crate) fn classification_prompt(doc_id: &str, page_id: u32, page_text: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(CLASSIFY_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("Document: {}\n", doc_id));
    prompt.push_str(&format!("Page: {}\n\n", page_id));
    prompt.push_str("Page text:\n");
    prompt.push_str("---\n");
    prompt.push_str(page_text);
    prompt.push_str("\n---\n");

    prompt
}
