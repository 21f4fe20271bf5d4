//! Candidate record validation logic

use crate::ValidationConfig;
use std::fmt;
use tally_domain::record::{MAX_PENCE, MAX_SHILLINGS};
use tally_domain::{PenceFraction, RecordCandidate, TransactionType};

/// Result of validating one candidate record
///
/// Not an error type: validation always produces a score and a (possibly
/// empty) violation list, and the candidate is emitted either way.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    /// Weighted fraction of passed rules, zeroed by hard-rule violations
    pub rule_confidence: f64,

    /// Violated rules, empty for a clean candidate
    pub violations: Vec<RuleViolation>,
}

impl Validation {
    /// True when no rule was violated
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Stable rule names for the audit column of the records relation
    pub fn rule_names(&self) -> Vec<String> {
        self.violations
            .iter()
            .map(|v| v.rule_name().to_string())
            .collect()
    }
}

/// A violated plausibility rule, carrying the offending value
#[derive(Debug, Clone, PartialEq)]
pub enum RuleViolation {
    /// Description is empty after trimming
    EmptyDescription,

    /// Shillings outside 0-19
    ShillingsOutOfRange {
        /// Offending value
        value: i64,
    },

    /// Pence outside 0-11
    PenceOutOfRange {
        /// Offending value
        value: i64,
    },

    /// Fractional-pence token not in the allowed set
    UnrecognizedPenceFraction {
        /// Offending token
        token: String,
    },

    /// Pounds below zero
    NegativePounds {
        /// Offending value
        value: i64,
    },

    /// Pounds above the configured sanity bound
    ImplausiblePounds {
        /// Offending value
        value: i64,
        /// Configured bound
        limit: i64,
    },

    /// Transaction-type token is not Credit, Debit, or Unknown
    MalformedTransactionType {
        /// Offending token
        token: String,
    },

    /// Pounds, shillings, and pence all absent - suspicious for a
    /// transaction row
    NoMonetaryValue,
}

impl RuleViolation {
    /// Stable snake_case rule name
    pub fn rule_name(&self) -> &'static str {
        match self {
            Self::EmptyDescription => "description_nonempty",
            Self::ShillingsOutOfRange { .. } => "shillings_range",
            Self::PenceOutOfRange { .. } => "pence_range",
            Self::UnrecognizedPenceFraction { .. } => "pence_fraction_allowed",
            Self::NegativePounds { .. } => "pounds_nonnegative",
            Self::ImplausiblePounds { .. } => "pounds_plausible",
            Self::MalformedTransactionType { .. } => "transaction_type_resolved",
            Self::NoMonetaryValue => "monetary_presence",
        }
    }

    /// True for rules whose violation zeroes the rule confidence
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            Self::ShillingsOutOfRange { .. } | Self::PenceOutOfRange { .. }
        )
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "description is empty"),
            Self::ShillingsOutOfRange { value } => {
                write!(f, "shillings {} outside 0-{}", value, MAX_SHILLINGS)
            }
            Self::PenceOutOfRange { value } => {
                write!(f, "pence {} outside 0-{}", value, MAX_PENCE)
            }
            Self::UnrecognizedPenceFraction { token } => {
                write!(f, "unrecognized pence fraction '{}'", token)
            }
            Self::NegativePounds { value } => write!(f, "negative pounds {}", value),
            Self::ImplausiblePounds { value, limit } => {
                write!(f, "pounds {} above sanity bound {}", value, limit)
            }
            Self::MalformedTransactionType { token } => {
                write!(f, "malformed transaction type '{}'", token)
            }
            Self::NoMonetaryValue => write!(f, "no monetary value present"),
        }
    }
}

/// The SchemaValidator scores candidates against the plausibility rules
///
/// Pure and deterministic: no external calls, and the same candidate always
/// produces the same validation.
pub struct SchemaValidator {
    config: ValidationConfig,
}

impl SchemaValidator {
    /// Create a validator with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Create a validator with default configuration
    pub fn default_config() -> Self {
        Self::new(ValidationConfig::default())
    }

    /// Validate one candidate record
    pub fn validate(&self, candidate: &RecordCandidate) -> Validation {
        let cfg = &self.config;
        let mut passed = 0.0;
        let mut total = 0.0;
        let mut violations = Vec::new();

        // 1. Description present; very short descriptions earn half credit
        total += cfg.description_weight;
        let description = candidate.description.trim();
        if description.is_empty() {
            violations.push(RuleViolation::EmptyDescription);
        } else if description.chars().count() < 3 {
            passed += cfg.description_weight * 0.5;
        } else {
            passed += cfg.description_weight;
        }

        // 2. Shillings range (hard); an absent value passes vacuously
        total += cfg.shillings_weight;
        match candidate.shillings {
            Some(value) if !(0..=MAX_SHILLINGS).contains(&value) => {
                violations.push(RuleViolation::ShillingsOutOfRange { value });
            }
            _ => passed += cfg.shillings_weight,
        }

        // 3. Pence range (hard)
        total += cfg.pence_weight;
        match candidate.pence {
            Some(value) if !(0..=MAX_PENCE).contains(&value) => {
                violations.push(RuleViolation::PenceOutOfRange { value });
            }
            _ => passed += cfg.pence_weight,
        }

        // 4. Fractional-pence token in the allowed set, or absent
        total += cfg.fraction_weight;
        match candidate.pence_fraction.as_deref() {
            None => passed += cfg.fraction_weight,
            Some(token) => {
                if PenceFraction::parse(token).is_some() {
                    passed += cfg.fraction_weight;
                } else {
                    violations.push(RuleViolation::UnrecognizedPenceFraction {
                        token: token.to_string(),
                    });
                }
            }
        }

        // 5. Pounds non-negative, and under the sanity bound when configured
        total += cfg.pounds_weight;
        match (candidate.pounds, cfg.max_pounds) {
            (Some(value), _) if value < 0 => {
                violations.push(RuleViolation::NegativePounds { value });
            }
            (Some(value), Some(limit)) if value > limit => {
                violations.push(RuleViolation::ImplausiblePounds { value, limit });
            }
            _ => passed += cfg.pounds_weight,
        }

        // 6. Transaction type resolved; Unknown is allowed but earns half
        //    credit, a malformed token earns none and is a violation
        total += cfg.transaction_type_weight;
        match candidate.resolved_type() {
            Some(TransactionType::Credit) | Some(TransactionType::Debit) => {
                passed += cfg.transaction_type_weight;
            }
            Some(TransactionType::Unknown) => {
                passed += cfg.transaction_type_weight * 0.5;
            }
            None => {
                violations.push(RuleViolation::MalformedTransactionType {
                    token: candidate.transaction_type.clone(),
                });
            }
        }

        // 7. At least one monetary field present
        total += cfg.monetary_presence_weight;
        if candidate.pounds.is_none()
            && candidate.shillings.is_none()
            && candidate.pence.is_none()
        {
            violations.push(RuleViolation::NoMonetaryValue);
        } else {
            passed += cfg.monetary_presence_weight;
        }

        let mut rule_confidence = if total > 0.0 {
            (passed / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        if cfg.enforce_hard_ranges && violations.iter().any(RuleViolation::is_hard) {
            rule_confidence = 0.0;
        }

        Validation {
            rule_confidence,
            violations,
        }
    }
}
