// Scoring engine
// The single synchronous entry point: series in, OrganismOutput out

use crate::aggregate::{AggregationMethod, TrustScoreBuilder};
use crate::config::{ScoringConfig, SignalThresholds};
use crate::error::{Result, ScoringError};
use crate::explain::build_explain;
use crate::organisms::{fear_index, market_flow, unslug, Factor};
use common::{InputSlice, OrganismKind, OrganismOutput, SignalKind};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Map an organism's trust score to its suggested signal. FearIndex is
/// inverted: a confident fear read leans RISK, a calm one BUY.
pub fn suggest_signal(kind: OrganismKind, trust: f64, thresholds: &SignalThresholds) -> SignalKind {
    let (high_leaning, low_leaning) = match kind {
        OrganismKind::FearIndex => (SignalKind::Risk, SignalKind::Buy),
        _ => (SignalKind::Buy, SignalKind::Risk),
    };
    if trust >= thresholds.high {
        high_leaning
    } else if trust >= thresholds.mid {
        SignalKind::Neutral
    } else {
        low_leaning
    }
}

/// Subset the configured weights to the factors that survived extraction and
/// renormalize them to sum to 1. A surviving factor with no configured
/// weight is a missing decision, not a zero.
fn resolve_weights(
    kind: OrganismKind,
    configured: Option<&BTreeMap<String, f64>>,
    factors: &[Factor],
) -> Result<BTreeMap<String, f64>> {
    let configured = configured.ok_or_else(|| {
        ScoringError::RequiredDecision(format!("{kind} weighted-mean weights"))
    })?;
    let mut subset = BTreeMap::new();
    let mut sum = 0.0;
    for factor in factors {
        let w = *configured.get(factor.name).ok_or_else(|| {
            ScoringError::RequiredDecision(format!("{kind} weight for factor {}", factor.name))
        })?;
        subset.insert(factor.name.to_string(), w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(ScoringError::InvalidWeights(format!(
            "{kind} weights sum to {sum}"
        )));
    }
    for w in subset.values_mut() {
        *w /= sum;
    }
    Ok(subset)
}

struct OrganismPlan<'a> {
    factors: Vec<Factor>,
    meta: Option<serde_json::Value>,
    method: &'a AggregationMethod,
    weights: Option<&'a BTreeMap<String, f64>>,
    thresholds: SignalThresholds,
}

/// The scoring core. Pure per symbol: no I/O, no shared mutable state, so
/// batches may score symbols concurrently.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Compute one organism's trust score and suggested signal for an
    /// ordered (oldest first) slice window.
    ///
    /// Slices violating the OHLCV invariant are dropped and the computation
    /// continues with the remainder. Factors the window cannot support are
    /// omitted. An unconfigured organism or an empty factor set is an error:
    /// no trust score is ever invented.
    pub fn compute_trust(
        &self,
        kind: OrganismKind,
        series: &[InputSlice],
    ) -> Result<OrganismOutput> {
        let valid: Vec<InputSlice> = series
            .iter()
            .filter(|slice| match slice.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(organism = %kind, error = %e, "dropping invalid slice");
                    false
                }
            })
            .cloned()
            .collect();
        if valid.is_empty() {
            return Err(ScoringError::EmptySeries);
        }

        let plan = match kind {
            OrganismKind::Unslug => {
                let cfg = self.config.unslug.as_ref().ok_or_else(|| {
                    ScoringError::RequiredDecision("UNSLUG configuration".to_string())
                })?;
                let (factors, meta) = unslug::extract(cfg, &valid)?;
                OrganismPlan {
                    factors,
                    meta,
                    method: &cfg.method,
                    weights: cfg.weights.as_ref(),
                    thresholds: cfg.thresholds,
                }
            }
            OrganismKind::FearIndex => {
                let cfg = self.config.fear_index.as_ref().ok_or_else(|| {
                    ScoringError::RequiredDecision("FearIndex configuration".to_string())
                })?;
                let (factors, meta) = fear_index::extract(cfg, &valid)?;
                OrganismPlan {
                    factors,
                    meta,
                    method: &cfg.method,
                    weights: cfg.weights.as_ref(),
                    thresholds: cfg.thresholds,
                }
            }
            OrganismKind::MarketFlow => {
                let cfg = self.config.market_flow.as_ref().ok_or_else(|| {
                    ScoringError::RequiredDecision("MarketFlow configuration".to_string())
                })?;
                let (factors, meta) = market_flow::extract(cfg, &valid)?;
                OrganismPlan {
                    factors,
                    meta,
                    method: &cfg.method,
                    weights: cfg.weights.as_ref(),
                    thresholds: cfg.thresholds,
                }
            }
        };

        if plan.factors.is_empty() {
            return Err(ScoringError::InsufficientFactors);
        }

        let mut builder = TrustScoreBuilder::new();
        for factor in &plan.factors {
            builder.add_factor(factor.name, factor.value)?;
        }
        let trust = match plan.method {
            AggregationMethod::Weighted => {
                let weights = resolve_weights(kind, plan.weights, &plan.factors)?;
                builder.compute_with_weights(&weights)?
            }
            method => builder.compute(method)?,
        };

        let latest = valid.last().expect("non-empty after validation");
        let signal = suggest_signal(kind, trust, &plan.thresholds);
        let explain = build_explain(&plan.factors);

        info!(
            organism = %kind,
            symbol = %latest.symbol,
            trust,
            signal = %signal,
            factors = plan.factors.len(),
            "trust computed"
        );

        Ok(OrganismOutput {
            organism: kind,
            symbol: latest.symbol.clone(),
            ts: latest.ts,
            signal,
            trust,
            explain,
            meta: plan.meta,
        })
    }
}
