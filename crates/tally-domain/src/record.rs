//! Ledger record types - the fundamental unit of extracted data

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a ledger entry
///
/// `Unknown` is a legitimate resolved value: historical pages frequently do
/// not mark the direction of an entry, and the model is instructed to say so
/// rather than guess. An unparseable type token is *not* `Unknown` - the
/// candidate keeps the raw token so the validator can tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money in
    Credit,
    /// Money out
    Debit,
    /// Direction not determinable from the page
    Unknown,
}

impl TransactionType {
    /// Parse a model-reported type token. Returns `None` for anything
    /// outside the three allowed values.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "Credit" => Some(Self::Credit),
            "Debit" => Some(Self::Debit),
            "Unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Canonical token for serialization and display
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "Credit",
            Self::Debit => "Debit",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fractional pence found in historical accounting
///
/// Pre-decimal ledgers record quarter-penny amounts either as vulgar
/// fractions or as scribal abbreviations (`q` for a farthing, `ob` for a
/// half-penny).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PenceFraction {
    /// One farthing (1/4d)
    #[serde(rename = "1/4")]
    Quarter,
    /// Half-penny (1/2d)
    #[serde(rename = "1/2")]
    Half,
    /// Three farthings (3/4d)
    #[serde(rename = "3/4")]
    ThreeQuarters,
}

impl PenceFraction {
    /// Parse an archival fraction token, accepting both vulgar-fraction and
    /// scribal forms. Returns `None` for unrecognized tokens.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "1/4" | "q" => Some(Self::Quarter),
            "1/2" | "ob" => Some(Self::Half),
            "3/4" => Some(Self::ThreeQuarters),
            _ => None,
        }
    }

    /// Canonical fraction notation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarter => "1/4",
            Self::Half => "1/2",
            Self::ThreeQuarters => "3/4",
        }
    }
}

impl fmt::Display for PenceFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bound for a plausible shillings value (20s = £1)
pub const MAX_SHILLINGS: i64 = 19;

/// Upper bound for a plausible pence value (12d = 1s)
pub const MAX_PENCE: i64 = 11;

/// Model-reported confidence per extracted field, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldConfidence {
    /// Confidence in the description text
    pub description: f64,
    /// Confidence in the transaction type
    pub transaction_type: f64,
    /// Confidence in the pounds amount
    pub pounds: f64,
    /// Confidence in the shillings amount
    pub shillings: f64,
    /// Confidence in the pence amount
    pub pence: f64,
    /// Confidence in the fractional pence marker
    pub pence_fraction: f64,
}

impl FieldConfidence {
    /// All fields at the same confidence
    pub fn uniform(value: f64) -> Self {
        let v = value.clamp(0.0, 1.0);
        Self {
            description: v,
            transaction_type: v,
            pounds: v,
            shillings: v,
            pence: v,
            pence_fraction: v,
        }
    }

    /// Clamp every field into [0, 1]
    pub fn clamped(self) -> Self {
        Self {
            description: self.description.clamp(0.0, 1.0),
            transaction_type: self.transaction_type.clamp(0.0, 1.0),
            pounds: self.pounds.clamp(0.0, 1.0),
            shillings: self.shillings.clamp(0.0, 1.0),
            pence: self.pence.clamp(0.0, 1.0),
            pence_fraction: self.pence_fraction.clamp(0.0, 1.0),
        }
    }
}

impl Default for FieldConfidence {
    fn default() -> Self {
        Self::uniform(0.0)
    }
}

/// A model-proposed row before validation and scoring
///
/// Raw token fields (`transaction_type`, `pence_fraction`) are kept as the
/// model reported them; resolution into the typed enums happens when the
/// finalized [`LedgerRecord`] is built, after the validator has seen the
/// original tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordCandidate {
    /// Row ordinal within the page
    pub row_id: u32,
    /// Extracted description, possibly empty
    pub description: String,
    /// Raw transaction-type token as reported by the model
    pub transaction_type: String,
    /// Pounds amount, absent when not legible
    pub pounds: Option<i64>,
    /// Shillings amount, absent when not legible
    pub shillings: Option<i64>,
    /// Pence amount, absent when not legible
    pub pence: Option<i64>,
    /// Raw fractional-pence token, absent when none present
    pub pence_fraction: Option<String>,
    /// Per-field model confidence
    pub confidence: FieldConfidence,
}

impl RecordCandidate {
    /// Resolve the raw type token, if it is one of the allowed values
    pub fn resolved_type(&self) -> Option<TransactionType> {
        TransactionType::parse(&self.transaction_type)
    }

    /// Resolve the raw fraction token, if present and recognized
    pub fn resolved_fraction(&self) -> Option<PenceFraction> {
        self.pence_fraction.as_deref().and_then(PenceFraction::parse)
    }
}

/// One finalized ledger transaction
///
/// Built exactly once per candidate by the validation and scoring pipeline;
/// never mutated afterwards. Reprocessing a page produces new records that
/// replace the old ones wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRecord {
    /// Source document identifier (filename stem, typically a year)
    pub doc_id: String,
    /// 1-based page ordinal within the document
    pub page_id: u32,
    /// Row ordinal within the page, unique per page
    pub row_id: u32,
    /// Extracted description, possibly empty
    pub description: String,
    /// Resolved transaction type; malformed tokens resolve to `Unknown`
    /// with a recorded violation
    pub transaction_type: TransactionType,
    /// Pounds amount
    pub pounds: Option<i64>,
    /// Shillings amount (plausible range 0-19)
    pub shillings: Option<i64>,
    /// Pence amount (plausible range 0-11)
    pub pence: Option<i64>,
    /// Fractional pence, when present and recognized
    pub pence_fraction: Option<PenceFraction>,
    /// Per-field model confidence as reported
    pub model_confidence: FieldConfidence,
    /// Weighted aggregate of the per-field confidences
    pub model_confidence_overall: f64,
    /// Deterministic rule-based plausibility score
    pub rule_confidence: f64,
    /// Blended score in [0, 1] used for review prioritization
    pub final_confidence: f64,
    /// Names of violated rules, empty for a clean row
    pub violations: Vec<String>,
}

impl LedgerRecord {
    /// True when no plausibility rule was violated
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_parse() {
        assert_eq!(TransactionType::parse("Credit"), Some(TransactionType::Credit));
        assert_eq!(TransactionType::parse("Debit"), Some(TransactionType::Debit));
        assert_eq!(TransactionType::parse("Unknown"), Some(TransactionType::Unknown));
        assert_eq!(TransactionType::parse("credit"), None);
        assert_eq!(TransactionType::parse("Withdrawal"), None);
    }

    #[test]
    fn test_pence_fraction_tokens() {
        assert_eq!(PenceFraction::parse("1/4"), Some(PenceFraction::Quarter));
        assert_eq!(PenceFraction::parse("q"), Some(PenceFraction::Quarter));
        assert_eq!(PenceFraction::parse("1/2"), Some(PenceFraction::Half));
        assert_eq!(PenceFraction::parse("ob"), Some(PenceFraction::Half));
        assert_eq!(PenceFraction::parse("3/4"), Some(PenceFraction::ThreeQuarters));
        assert_eq!(PenceFraction::parse("2/3"), None);
        assert_eq!(PenceFraction::parse(""), None);
    }

    #[test]
    fn test_field_confidence_clamped() {
        let c = FieldConfidence {
            description: 1.4,
            transaction_type: -0.2,
            pounds: 0.5,
            shillings: 0.5,
            pence: 0.5,
            pence_fraction: 0.5,
        }
        .clamped();
        assert_eq!(c.description, 1.0);
        assert_eq!(c.transaction_type, 0.0);
        assert_eq!(c.pounds, 0.5);
    }

    #[test]
    fn test_candidate_resolution() {
        let candidate = RecordCandidate {
            row_id: 0,
            description: "To cash received".to_string(),
            transaction_type: "Credit".to_string(),
            pounds: Some(3),
            shillings: Some(12),
            pence: Some(6),
            pence_fraction: Some("q".to_string()),
            confidence: FieldConfidence::uniform(0.9),
        };
        assert_eq!(candidate.resolved_type(), Some(TransactionType::Credit));
        assert_eq!(candidate.resolved_fraction(), Some(PenceFraction::Quarter));
    }

    #[test]
    fn test_record_serializes_with_archival_tokens() {
        let record = LedgerRecord {
            doc_id: "1704".to_string(),
            page_id: 1,
            row_id: 0,
            description: "To cash".to_string(),
            transaction_type: TransactionType::Credit,
            pounds: Some(3),
            shillings: Some(12),
            pence: Some(6),
            pence_fraction: Some(PenceFraction::Quarter),
            model_confidence: FieldConfidence::uniform(0.9),
            model_confidence_overall: 0.9,
            rule_confidence: 1.0,
            final_confidence: 0.95,
            violations: Vec::new(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["transaction_type"], "Credit");
        assert_eq!(json["pence_fraction"], "1/4");
        assert_eq!(json["shillings"], 12);
        assert_eq!(json["violations"], serde_json::json!([]));
    }

    #[test]
    fn test_candidate_malformed_tokens() {
        let candidate = RecordCandidate {
            row_id: 0,
            description: String::new(),
            transaction_type: "CREDIT!!".to_string(),
            pounds: None,
            shillings: None,
            pence: None,
            pence_fraction: Some("5/8".to_string()),
            confidence: FieldConfidence::default(),
        };
        assert_eq!(candidate.resolved_type(), None);
        assert_eq!(candidate.resolved_fraction(), None);
    }
}
