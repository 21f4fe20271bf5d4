//! Validation rule configuration

use serde::{Deserialize, Serialize};

/// Per-rule weights and hard-rule behavior
///
/// Each rule contributes its weight to the pass tally; the rule confidence
/// is the weighted fraction of passed rules. Shillings and pence ranges are
/// hard rules: when `enforce_hard_ranges` is set, violating either forces
/// the rule confidence to zero no matter what else passed - out-of-range
/// currency subunits are never plausible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Weight of the description-present rule
    pub description_weight: f64,

    /// Weight of the transaction-type rule
    pub transaction_type_weight: f64,

    /// Weight of the pounds non-negativity/plausibility rule
    pub pounds_weight: f64,

    /// Weight of the shillings range rule (hard)
    pub shillings_weight: f64,

    /// Weight of the pence range rule (hard)
    pub pence_weight: f64,

    /// Weight of the fractional-pence token rule
    pub fraction_weight: f64,

    /// Weight of the some-monetary-value-present rule
    pub monetary_presence_weight: f64,

    /// Zero the rule confidence when a hard range rule is violated
    pub enforce_hard_ranges: bool,

    /// Optional upper sanity bound for pounds amounts
    ///
    /// Archives with a known typical maximum can reject transcription
    /// glitches that turn £3 into £3000. Disabled by default.
    pub max_pounds: Option<i64>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            description_weight: 1.0,
            transaction_type_weight: 1.0,
            pounds_weight: 1.0,
            shillings_weight: 1.0,
            pence_weight: 1.0,
            fraction_weight: 1.0,
            monetary_presence_weight: 1.0,
            enforce_hard_ranges: true,
            max_pounds: None,
        }
    }
}

impl ValidationConfig {
    /// Permissive configuration: hard rules still count against the tally
    /// but never zero the score outright
    pub fn permissive() -> Self {
        Self {
            enforce_hard_ranges: false,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("description_weight", self.description_weight),
            ("transaction_type_weight", self.transaction_type_weight),
            ("pounds_weight", self.pounds_weight),
            ("shillings_weight", self.shillings_weight),
            ("pence_weight", self.pence_weight),
            ("fraction_weight", self.fraction_weight),
            ("monetary_presence_weight", self.monetary_presence_weight),
        ];
        let mut total = 0.0;
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(format!("{} must be a non-negative finite number", name));
            }
            total += w;
        }
        if total <= 0.0 {
            return Err("rule weights must not all be zero".to_string());
        }
        if let Some(limit) = self.max_pounds {
            if limit < 0 {
                return Err("max_pounds must be non-negative".to_string());
            }
        }
        Ok(())
    }
}
