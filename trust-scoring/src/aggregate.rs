// Trust aggregation engine
// Monotone combining functions: improving any factor never lowers the score

use crate::error::{Result, ScoringError};
use crate::normalize::{clamp_unit, logistic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance when checking that explicit weights sum to 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Selectable aggregation method. Every variant is monotone: increasing any
/// single input weakly increases the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Plain average. Least resistant to a single weak factor.
    Arithmetic,
    /// Zero-propagating: any factor at 0 forces the score to 0.
    Geometric,
    /// Penalizes low outliers harder than the arithmetic mean.
    Harmonic,
    /// Arithmetic mean clipped at a ceiling.
    Capped { cap: f64 },
    /// Explicit per-factor weights, supplied via `compute_with_weights`.
    Weighted,
    /// Weighted-mean response curve steepened through a logistic around 0.5.
    LogisticBlend { sharpness: f64 },
    /// Blend of the minimum factor and the mean: the weakest link shows
    /// through without fully dominating.
    MinMeanHybrid { min_weight: f64 },
}

pub fn arithmetic_mean(factors: &[f64]) -> Result<f64> {
    if factors.is_empty() {
        return Err(ScoringError::InsufficientFactors);
    }
    Ok(clamp_unit(factors.iter().sum::<f64>() / factors.len() as f64))
}

/// Geometric mean, zero-propagating: a single factor at 0 yields exactly 0,
/// all factors at 1 yield exactly 1.
pub fn geometric_mean(factors: &[f64]) -> Result<f64> {
    if factors.is_empty() {
        return Err(ScoringError::InsufficientFactors);
    }
    if factors.iter().any(|f| *f == 0.0) {
        return Ok(0.0);
    }
    let log_sum: f64 = factors.iter().map(|f| f.ln()).sum();
    Ok(clamp_unit((log_sum / factors.len() as f64).exp()))
}

pub fn harmonic_mean(factors: &[f64]) -> Result<f64> {
    if factors.is_empty() {
        return Err(ScoringError::InsufficientFactors);
    }
    if factors.iter().any(|f| *f == 0.0) {
        return Ok(0.0);
    }
    let reciprocal_sum: f64 = factors.iter().map(|f| 1.0 / f).sum();
    Ok(clamp_unit(factors.len() as f64 / reciprocal_sum))
}

/// Arithmetic mean clipped at `cap`, modeling epistemic humility.
pub fn capped_mean(factors: &[f64], cap: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&cap) {
        return Err(ScoringError::Validation(format!(
            "capped-mean ceiling outside [0, 1]: {cap}"
        )));
    }
    Ok(arithmetic_mean(factors)?.min(cap))
}

/// Weighted mean with caller-supplied weights. Weights must be non-negative,
/// one per factor, and sum to 1 within [`WEIGHT_TOLERANCE`].
pub fn weighted_mean(factors: &[f64], weights: &[f64]) -> Result<f64> {
    if factors.is_empty() {
        return Err(ScoringError::InsufficientFactors);
    }
    if weights.len() != factors.len() {
        return Err(ScoringError::InvalidWeights(format!(
            "{} weights for {} factors",
            weights.len(),
            factors.len()
        )));
    }
    if let Some(w) = weights.iter().find(|w| **w < 0.0 || !w.is_finite()) {
        return Err(ScoringError::InvalidWeights(format!("negative weight {w}")));
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ScoringError::InvalidWeights(format!(
            "weights sum to {sum}, expected 1"
        )));
    }
    let score = factors.iter().zip(weights).map(|(f, w)| f * w).sum::<f64>();
    Ok(clamp_unit(score))
}

/// Equal-weight mean passed through a logistic centered on 0.5: mean 0.5 maps
/// to 0.5, extremes are amplified by `sharpness`. Monotone and bounded.
pub fn logistic_blend(factors: &[f64], sharpness: f64) -> Result<f64> {
    if sharpness <= 0.0 || !sharpness.is_finite() {
        return Err(ScoringError::Validation(format!(
            "logistic-blend sharpness must be positive: {sharpness}"
        )));
    }
    let mean = arithmetic_mean(factors)?;
    Ok(logistic(mean - 0.5, sharpness))
}

/// `(1 - min_weight) * mean + min_weight * min(factors)`.
pub fn min_mean_hybrid(factors: &[f64], min_weight: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&min_weight) {
        return Err(ScoringError::Validation(format!(
            "min-mean weight outside [0, 1]: {min_weight}"
        )));
    }
    let mean = arithmetic_mean(factors)?;
    let min = factors.iter().cloned().fold(f64::INFINITY, f64::min);
    Ok(clamp_unit((1.0 - min_weight) * mean + min_weight * min))
}

/// Two-phase builder for composing a trust score from named factors.
///
/// Accumulation phase: `add_factor` validates each value against the [0, 1]
/// contract (out-of-contract values are rejected, never silently clamped).
/// Finalization: the first successful `compute`/`compute_with_weights` call
/// freezes the builder; later mutation or recomputation fails with
/// [`ScoringError::BuilderFinalized`].
#[derive(Debug, Default)]
pub struct TrustScoreBuilder {
    factors: BTreeMap<String, f64>,
    finalized: bool,
}

impl TrustScoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_factor(&mut self, name: impl Into<String>, value: f64) -> Result<&mut Self> {
        if self.finalized {
            return Err(ScoringError::BuilderFinalized);
        }
        let name = name.into();
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ScoringError::FactorOutOfRange { name, value });
        }
        if self.factors.contains_key(&name) {
            return Err(ScoringError::DuplicateFactor(name));
        }
        self.factors.insert(name, value);
        Ok(self)
    }

    pub fn factors(&self) -> &BTreeMap<String, f64> {
        &self.factors
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Compute the trust score with the selected method and finalize the
    /// builder. `Weighted` must go through [`Self::compute_with_weights`].
    pub fn compute(&mut self, method: &AggregationMethod) -> Result<f64> {
        if self.finalized {
            return Err(ScoringError::BuilderFinalized);
        }
        let values: Vec<f64> = self.factors.values().copied().collect();
        let score = match method {
            AggregationMethod::Arithmetic => arithmetic_mean(&values)?,
            AggregationMethod::Geometric => geometric_mean(&values)?,
            AggregationMethod::Harmonic => harmonic_mean(&values)?,
            AggregationMethod::Capped { cap } => capped_mean(&values, *cap)?,
            AggregationMethod::Weighted => {
                return Err(ScoringError::InvalidWeights(
                    "weighted aggregation requires compute_with_weights".to_string(),
                ))
            }
            AggregationMethod::LogisticBlend { sharpness } => {
                logistic_blend(&values, *sharpness)?
            }
            AggregationMethod::MinMeanHybrid { min_weight } => {
                min_mean_hybrid(&values, *min_weight)?
            }
        };
        self.finalized = true;
        Ok(score)
    }

    /// Weighted-mean computation. `weights` must cover every accumulated
    /// factor by name and sum to 1 within [`WEIGHT_TOLERANCE`].
    pub fn compute_with_weights(&mut self, weights: &BTreeMap<String, f64>) -> Result<f64> {
        if self.finalized {
            return Err(ScoringError::BuilderFinalized);
        }
        if self.factors.is_empty() {
            return Err(ScoringError::InsufficientFactors);
        }
        let mut values = Vec::with_capacity(self.factors.len());
        let mut aligned = Vec::with_capacity(self.factors.len());
        for (name, value) in &self.factors {
            let w = weights.get(name).ok_or_else(|| {
                ScoringError::InvalidWeights(format!("missing weight for factor {name}"))
            })?;
            values.push(*value);
            aligned.push(*w);
        }
        let score = weighted_mean(&values, &aligned)?;
        self.finalized = true;
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const METHODS: &[AggregationMethod] = &[
        AggregationMethod::Arithmetic,
        AggregationMethod::Geometric,
        AggregationMethod::Harmonic,
        AggregationMethod::Capped { cap: 0.95 },
        AggregationMethod::LogisticBlend { sharpness: 5.0 },
        AggregationMethod::MinMeanHybrid { min_weight: 0.3 },
    ];

    fn compute(method: &AggregationMethod, values: &[f64]) -> f64 {
        let mut builder = TrustScoreBuilder::new();
        for (i, v) in values.iter().enumerate() {
            builder.add_factor(format!("f{i}"), *v).unwrap();
        }
        builder.compute(method).unwrap()
    }

    #[test]
    fn test_every_method_is_monotone() {
        let base = [0.3, 0.6, 0.8];
        for method in METHODS {
            for bumped_index in 0..base.len() {
                let mut prev = None;
                for step in 0..=10 {
                    let mut values = base;
                    values[bumped_index] = f64::from(step) / 10.0;
                    let score = compute(method, &values);
                    if let Some(p) = prev {
                        assert!(
                            score >= p - 1e-12,
                            "{method:?} decreased when factor {bumped_index} rose"
                        );
                    }
                    prev = Some(score);
                }
            }
        }
    }

    #[test]
    fn test_every_method_stays_in_unit_interval() {
        let cases: &[&[f64]] = &[&[0.0], &[1.0], &[0.0, 1.0], &[0.5, 0.5, 0.5], &[1e-9, 1.0]];
        for method in METHODS {
            for values in cases {
                let score = compute(method, values);
                assert!((0.0..=1.0).contains(&score), "{method:?} gave {score}");
                assert!(score.is_finite());
            }
        }
    }

    #[test]
    fn test_geometric_zero_propagates() {
        assert_eq!(geometric_mean(&[0.9, 0.0, 0.8]).unwrap(), 0.0);
        assert_eq!(geometric_mean(&[1.0, 1.0, 1.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_geometric_known_value() {
        let score = geometric_mean(&[0.8, 0.6, 0.9]).unwrap();
        assert_relative_eq!(score, (0.8f64 * 0.6 * 0.9).powf(1.0 / 3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_harmonic_penalizes_low_outlier_more_than_arithmetic() {
        let values = [0.9, 0.9, 0.1];
        assert!(harmonic_mean(&values).unwrap() < arithmetic_mean(&values).unwrap());
    }

    #[test]
    fn test_capped_mean_clips() {
        assert_relative_eq!(capped_mean(&[0.99, 0.98, 0.97], 0.95).unwrap(), 0.95);
        assert!(capped_mean(&[0.5], 1.5).is_err());
    }

    #[test]
    fn test_weighted_mean_checks_weights() {
        assert!(matches!(
            weighted_mean(&[0.5, 0.5], &[0.9, 0.2]),
            Err(ScoringError::InvalidWeights(_))
        ));
        assert!(matches!(
            weighted_mean(&[0.5, 0.5], &[-0.5, 1.5]),
            Err(ScoringError::InvalidWeights(_))
        ));
        let score = weighted_mean(&[0.8, 0.6], &[2.0 / 3.0, 1.0 / 3.0]).unwrap();
        assert_relative_eq!(score, 0.8 * 2.0 / 3.0 + 0.6 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_logistic_blend_pivot() {
        assert_relative_eq!(logistic_blend(&[0.5, 0.5], 5.0).unwrap(), 0.5);
        assert!(logistic_blend(&[0.9, 0.9], 5.0).unwrap() > 0.5);
        assert!(logistic_blend(&[0.1, 0.1], 5.0).unwrap() < 0.5);
    }

    #[test]
    fn test_min_mean_hybrid() {
        let score = min_mean_hybrid(&[0.9, 0.6, 0.8], 0.3).unwrap();
        let mean = (0.9 + 0.6 + 0.8) / 3.0;
        assert_relative_eq!(score, 0.7 * mean + 0.3 * 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_factor_set_is_an_error() {
        assert!(matches!(
            arithmetic_mean(&[]),
            Err(ScoringError::InsufficientFactors)
        ));
        let mut builder = TrustScoreBuilder::new();
        assert!(matches!(
            builder.compute(&AggregationMethod::Geometric),
            Err(ScoringError::InsufficientFactors)
        ));
    }

    #[test]
    fn test_builder_rejects_out_of_range_factor() {
        let mut builder = TrustScoreBuilder::new();
        assert!(matches!(
            builder.add_factor("vwap_z", 1.2),
            Err(ScoringError::FactorOutOfRange { .. })
        ));
        assert!(matches!(
            builder.add_factor("vwap_z", f64::NAN),
            Err(ScoringError::FactorOutOfRange { .. })
        ));
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let mut builder = TrustScoreBuilder::new();
        builder.add_factor("liquidity", 0.8).unwrap();
        assert!(matches!(
            builder.add_factor("liquidity", 0.9),
            Err(ScoringError::DuplicateFactor(_))
        ));
    }

    #[test]
    fn test_builder_is_write_once() {
        let mut builder = TrustScoreBuilder::new();
        builder.add_factor("a", 0.8).unwrap();
        builder.compute(&AggregationMethod::Arithmetic).unwrap();
        assert!(matches!(
            builder.add_factor("b", 0.5),
            Err(ScoringError::BuilderFinalized)
        ));
        assert!(matches!(
            builder.compute(&AggregationMethod::Arithmetic),
            Err(ScoringError::BuilderFinalized)
        ));
    }

    #[test]
    fn test_failed_compute_does_not_finalize() {
        let mut builder = TrustScoreBuilder::new();
        assert!(builder.compute(&AggregationMethod::Arithmetic).is_err());
        builder.add_factor("late", 0.4).unwrap();
        assert_relative_eq!(builder.compute(&AggregationMethod::Arithmetic).unwrap(), 0.4);
    }

    #[test]
    fn test_compute_with_weights_by_name() {
        let mut builder = TrustScoreBuilder::new();
        builder.add_factor("a", 0.8).unwrap();
        builder.add_factor("b", 0.6).unwrap();
        let mut weights = BTreeMap::new();
        weights.insert("a".to_string(), 0.75);
        weights.insert("b".to_string(), 0.25);
        let score = builder.compute_with_weights(&weights).unwrap();
        assert_relative_eq!(score, 0.8 * 0.75 + 0.6 * 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_compute_with_weights_missing_name() {
        let mut builder = TrustScoreBuilder::new();
        builder.add_factor("a", 0.8).unwrap();
        let weights = BTreeMap::new();
        assert!(matches!(
            builder.compute_with_weights(&weights),
            Err(ScoringError::InvalidWeights(_))
        ));
    }

    #[test]
    fn test_weighted_marker_via_compute_fails() {
        let mut builder = TrustScoreBuilder::new();
        builder.add_factor("a", 0.8).unwrap();
        assert!(matches!(
            builder.compute(&AggregationMethod::Weighted),
            Err(ScoringError::InvalidWeights(_))
        ));
    }

    #[test]
    fn test_method_serde_shape() {
        let json = serde_json::to_string(&AggregationMethod::Capped { cap: 0.95 }).unwrap();
        assert_eq!(json, r#"{"kind":"capped","cap":0.95}"#);
        let back: AggregationMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AggregationMethod::Capped { cap: 0.95 });
    }
}
