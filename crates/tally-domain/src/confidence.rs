//! Confidence aggregation: weighted field mean plus additive blending
//!
//! Two independent layers feed the final score. The model layer is the
//! weighted mean of the per-field confidences the extraction model reports
//! about itself; the rule layer is the deterministic plausibility score from
//! the validator. The two are blended additively so a single weak signal
//! cannot zero out an otherwise strong record - a hard rule violation
//! already forces the rule layer to zero upstream, which depresses the
//! blended score without letting model fluency hide it.

use crate::record::FieldConfidence;
use serde::{Deserialize, Serialize};

/// Default weight of the model-reported layer in the final blend
pub const DEFAULT_MODEL_WEIGHT: f64 = 0.5;

/// Default weight of the rule-based layer in the final blend
pub const DEFAULT_RULE_WEIGHT: f64 = 0.5;

/// Relative importance of each field group in the model-confidence mean
///
/// The monetary weight covers pounds, shillings, pence and the fractional
/// marker together, split evenly across the four.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldWeights {
    /// Weight of the description confidence
    pub description: f64,
    /// Weight of the transaction-type confidence
    pub transaction_type: f64,
    /// Combined weight of the four monetary-field confidences
    pub monetary: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            description: 0.2,
            transaction_type: 0.2,
            monetary: 0.6,
        }
    }
}

impl FieldWeights {
    /// Weighted mean of the per-field confidences, in [0, 1]
    ///
    /// Returns 0.0 when all weights are zero rather than dividing by zero.
    pub fn aggregate(&self, confidence: &FieldConfidence) -> f64 {
        let c = confidence.clamped();
        let monetary_mean = (c.pounds + c.shillings + c.pence + c.pence_fraction) / 4.0;

        let total = self.description + self.transaction_type + self.monetary;
        if total <= 0.0 {
            return 0.0;
        }

        let weighted = self.description * c.description
            + self.transaction_type * c.transaction_type
            + self.monetary * monetary_mean;

        (weighted / total).clamp(0.0, 1.0)
    }
}

/// Configuration for confidence aggregation
///
/// The exact constants are deliberately configuration, not code: archives
/// differ in how trustworthy model self-reports are, and review workflows
/// tune the blend accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Per-field weights for the model-confidence mean
    pub field_weights: FieldWeights,
    /// Weight of the model layer in the final blend
    pub model_weight: f64,
    /// Weight of the rule layer in the final blend
    pub rule_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            field_weights: FieldWeights::default(),
            model_weight: DEFAULT_MODEL_WEIGHT,
            rule_weight: DEFAULT_RULE_WEIGHT,
        }
    }
}

impl ScoringConfig {
    /// Aggregate the per-field model confidences into one scalar
    pub fn model_confidence(&self, confidence: &FieldConfidence) -> f64 {
        self.field_weights.aggregate(confidence)
    }

    /// Blend model and rule confidence into the final score
    ///
    /// `final = clamp(w_m * model + w_r * rule, 0, 1)`
    pub fn blend(&self, model_confidence: f64, rule_confidence: f64) -> f64 {
        let model = model_confidence.clamp(0.0, 1.0);
        let rule = rule_confidence.clamp(0.0, 1.0);
        (self.model_weight * model + self.rule_weight * rule).clamp(0.0, 1.0)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("model_weight", self.model_weight),
            ("rule_weight", self.rule_weight),
            ("field_weights.description", self.field_weights.description),
            ("field_weights.transaction_type", self.field_weights.transaction_type),
            ("field_weights.monetary", self.field_weights.monetary),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(format!("{} must be a non-negative finite number", name));
            }
        }
        if self.model_weight + self.rule_weight <= 0.0 {
            return Err("model_weight and rule_weight must not both be zero".to_string());
        }
        let field_total = self.field_weights.description
            + self.field_weights.transaction_type
            + self.field_weights.monetary;
        if field_total <= 0.0 {
            return Err("field weights must not all be zero".to_string());
        }
        Ok(())
    }
}

/// Distribution statistics over final confidences
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceStats {
    /// Arithmetic mean
    pub mean: f64,
    /// Median (midpoint average for even counts)
    pub median: f64,
    /// Minimum
    pub min: f64,
}

impl ConfidenceStats {
    /// Compute stats over a set of scores. Returns `None` for an empty set.
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }

        let mut sorted: Vec<f64> = scores.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            mean,
            median,
            min: sorted[0],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_blend_arithmetic() {
        // model 0.9 and rule 0.6 at equal weights must land on 0.75
        let config = ScoringConfig::default();
        let blended = config.blend(0.9, 0.6);
        assert!((blended - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_blend_clamps_to_unit_interval() {
        let config = ScoringConfig {
            model_weight: 1.0,
            rule_weight: 1.0,
            ..ScoringConfig::default()
        };
        assert_eq!(config.blend(1.0, 1.0), 1.0);
        assert_eq!(config.blend(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_hard_rule_zero_still_depresses_final() {
        let config = ScoringConfig::default();
        // perfect model self-report, zeroed rule layer
        let blended = config.blend(1.0, 0.0);
        assert!((blended - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_uniform_fields() {
        let weights = FieldWeights::default();
        let agg = weights.aggregate(&FieldConfidence::uniform(0.8));
        assert!((agg - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_field_importance() {
        let weights = FieldWeights::default();
        // only the description is confident; at weight 0.2 the mean is 0.2
        let confidence = FieldConfidence {
            description: 1.0,
            ..FieldConfidence::uniform(0.0)
        };
        let agg = weights.aggregate(&confidence);
        assert!((agg - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_do_not_divide_by_zero() {
        let weights = FieldWeights {
            description: 0.0,
            transaction_type: 0.0,
            monetary: 0.0,
        };
        assert_eq!(weights.aggregate(&FieldConfidence::uniform(1.0)), 0.0);
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let config = ScoringConfig {
            model_weight: -0.5,
            ..ScoringConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_all_zero_blend() {
        let config = ScoringConfig {
            model_weight: 0.0,
            rule_weight: 0.0,
            ..ScoringConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stats_odd_and_even_counts() {
        let odd = ConfidenceStats::from_scores(&[0.2, 0.9, 0.5]).unwrap();
        assert!((odd.median - 0.5).abs() < 1e-9);
        assert!((odd.min - 0.2).abs() < 1e-9);

        let even = ConfidenceStats::from_scores(&[0.2, 0.4, 0.6, 0.8]).unwrap();
        assert!((even.median - 0.5).abs() < 1e-9);
        assert!((even.mean - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_stats_empty() {
        assert!(ConfidenceStats::from_scores(&[]).is_none());
    }

    proptest! {
        #[test]
        fn prop_blend_stays_in_unit_interval(
            model in 0.0f64..=1.0,
            rule in 0.0f64..=1.0,
            w_m in 0.0f64..=2.0,
            w_r in 0.0f64..=2.0,
        ) {
            let config = ScoringConfig {
                field_weights: FieldWeights::default(),
                model_weight: w_m,
                rule_weight: w_r,
            };
            let blended = config.blend(model, rule);
            prop_assert!((0.0..=1.0).contains(&blended));
        }

        #[test]
        fn prop_aggregate_stays_in_unit_interval(
            d in 0.0f64..=1.0,
            t in 0.0f64..=1.0,
            p in 0.0f64..=1.0,
            s in 0.0f64..=1.0,
            pe in 0.0f64..=1.0,
            pf in 0.0f64..=1.0,
        ) {
            let confidence = FieldConfidence {
                description: d,
                transaction_type: t,
                pounds: p,
                shillings: s,
                pence: pe,
                pence_fraction: pf,
            };
            let agg = FieldWeights::default().aggregate(&confidence);
            prop_assert!((0.0..=1.0).contains(&agg));
        }

        #[test]
        fn prop_blend_is_monotone_in_rule_confidence(
            model in 0.0f64..=1.0,
            rule_lo in 0.0f64..=1.0,
            rule_hi in 0.0f64..=1.0,
        ) {
            let (lo, hi) = if rule_lo <= rule_hi { (rule_lo, rule_hi) } else { (rule_hi, rule_lo) };
            let config = ScoringConfig::default();
            prop_assert!(config.blend(model, lo) <= config.blend(model, hi) + 1e-12);
        }
    }
}
