//! Scoring configuration
//!
//! Every threshold, weight set, and aggregation method is an explicit
//! operator decision. Absent decisions surface as `RequiredDecision` at
//! compute time; only window geometry carries defaults.

use crate::aggregate::AggregationMethod;
use crate::error::{Result, ScoringError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-organism scoring configuration. An organism left as `None` cannot be
/// scored: `compute_trust` reports the missing decision instead of guessing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub unslug: Option<UnslugConfig>,
    #[serde(default)]
    pub fear_index: Option<FearIndexConfig>,
    #[serde(default)]
    pub market_flow: Option<MarketFlowConfig>,
}

/// Trust cutoffs separating the three suggested signals. No defaults: the
/// separating values are an upstream decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub high: f64,
    pub mid: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnslugConfig {
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_rebound_window")]
    pub rebound_window: usize,
    #[serde(default = "default_consistency_windows")]
    pub consistency_windows: Vec<usize>,
    /// Volume floor for the liquidity factor (shares per session).
    #[serde(default = "default_min_volume")]
    pub min_volume: f64,
    pub method: AggregationMethod,
    #[serde(default)]
    pub weights: Option<BTreeMap<String, f64>>,
    pub thresholds: SignalThresholds,
    #[serde(default)]
    pub reference_band: Option<ReferenceBandConfig>,
}

/// Anchored retracement-band scan settings. The anchor window bounds the
/// search for the reference low (e.g. a crash trough).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceBandConfig {
    pub anchor_start: DateTime<Utc>,
    pub anchor_end: DateTime<Utc>,
    #[serde(default = "default_hit_lookback")]
    pub hit_lookback: usize,
    /// Tolerance around the 23.6% level, as a percentage of the anchor range.
    #[serde(default = "default_band_tolerance_pct")]
    pub tolerance_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FearIndexConfig {
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// Overnight gap size (fraction of prior close) counted as a gap event.
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: f64,
    pub method: AggregationMethod,
    #[serde(default)]
    pub weights: Option<BTreeMap<String, f64>>,
    pub thresholds: SignalThresholds,
    #[serde(default)]
    pub gauge: Option<FearGaugeConfig>,
}

/// Window geometry for the seven-component psychology gauge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FearGaugeConfig {
    #[serde(default = "default_momentum_ma")]
    pub momentum_ma: usize,
    #[serde(default = "default_strength_window")]
    pub strength_window: usize,
    #[serde(default = "default_breadth_window")]
    pub breadth_window: usize,
    #[serde(default = "default_rv_window")]
    pub rv_window: usize,
    #[serde(default = "default_rv_ref_window")]
    pub rv_ref_window: usize,
    #[serde(default = "default_safehaven_window")]
    pub safehaven_window: usize,
}

impl Default for FearGaugeConfig {
    fn default() -> Self {
        Self {
            momentum_ma: default_momentum_ma(),
            strength_window: default_strength_window(),
            breadth_window: default_breadth_window(),
            rv_window: default_rv_window(),
            rv_ref_window: default_rv_ref_window(),
            safehaven_window: default_safehaven_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketFlowConfig {
    #[serde(default = "default_flow_lookback")]
    pub lookback: usize,
    pub method: AggregationMethod,
    #[serde(default)]
    pub weights: Option<BTreeMap<String, f64>>,
    pub thresholds: SignalThresholds,
}

fn default_lookback() -> usize {
    20
}

fn default_rebound_window() -> usize {
    5
}

fn default_consistency_windows() -> Vec<usize> {
    vec![5, 10, 20]
}

fn default_min_volume() -> f64 {
    1_000_000.0
}

fn default_hit_lookback() -> usize {
    30
}

fn default_band_tolerance_pct() -> f64 {
    3.0
}

fn default_gap_threshold() -> f64 {
    0.02
}

fn default_momentum_ma() -> usize {
    125
}

fn default_strength_window() -> usize {
    252
}

fn default_breadth_window() -> usize {
    20
}

fn default_rv_window() -> usize {
    20
}

fn default_rv_ref_window() -> usize {
    50
}

fn default_safehaven_window() -> usize {
    20
}

fn default_flow_lookback() -> usize {
    10
}

impl SignalThresholds {
    fn validate(&self, organism: &str) -> Result<()> {
        let ok = self.high.is_finite()
            && self.mid.is_finite()
            && (0.0..=1.0).contains(&self.mid)
            && (0.0..=1.0).contains(&self.high)
            && self.mid <= self.high;
        if !ok {
            return Err(ScoringError::Validation(format!(
                "{organism} thresholds must satisfy 0 <= mid <= high <= 1, got mid={} high={}",
                self.mid, self.high
            )));
        }
        Ok(())
    }
}

fn validate_method(
    organism: &str,
    method: &AggregationMethod,
    weights: Option<&BTreeMap<String, f64>>,
) -> Result<()> {
    match method {
        AggregationMethod::Capped { cap } if !(0.0..=1.0).contains(cap) => {
            Err(ScoringError::Validation(format!(
                "{organism} capped-mean ceiling outside [0, 1]: {cap}"
            )))
        }
        AggregationMethod::LogisticBlend { sharpness } if *sharpness <= 0.0 => {
            Err(ScoringError::Validation(format!(
                "{organism} logistic-blend sharpness must be positive: {sharpness}"
            )))
        }
        AggregationMethod::MinMeanHybrid { min_weight } if !(0.0..=1.0).contains(min_weight) => {
            Err(ScoringError::Validation(format!(
                "{organism} min-mean weight outside [0, 1]: {min_weight}"
            )))
        }
        AggregationMethod::Weighted => match weights {
            None => Err(ScoringError::RequiredDecision(format!(
                "{organism} weighted-mean weights"
            ))),
            Some(w) if w.values().any(|v| *v < 0.0 || !v.is_finite()) => Err(
                ScoringError::InvalidWeights(format!("{organism} weights must be non-negative")),
            ),
            Some(_) => Ok(()),
        },
        _ => Ok(()),
    }
}

impl ScoringConfig {
    /// Structural validation; called once when the engine is constructed.
    pub fn validate(&self) -> Result<()> {
        if let Some(cfg) = &self.unslug {
            cfg.thresholds.validate("UNSLUG")?;
            validate_method("UNSLUG", &cfg.method, cfg.weights.as_ref())?;
            if cfg.lookback < 2 || cfg.rebound_window < 2 {
                return Err(ScoringError::Validation(
                    "UNSLUG windows must span at least 2 slices".to_string(),
                ));
            }
            if cfg.min_volume < 0.0 {
                return Err(ScoringError::Validation(
                    "UNSLUG min_volume must be non-negative".to_string(),
                ));
            }
            if let Some(band) = &cfg.reference_band {
                if band.anchor_start >= band.anchor_end {
                    return Err(ScoringError::Validation(
                        "reference band anchor window is empty".to_string(),
                    ));
                }
                if band.hit_lookback == 0 || band.tolerance_pct < 0.0 {
                    return Err(ScoringError::Validation(
                        "reference band hit_lookback/tolerance out of range".to_string(),
                    ));
                }
            }
        }
        if let Some(cfg) = &self.fear_index {
            cfg.thresholds.validate("FearIndex")?;
            validate_method("FearIndex", &cfg.method, cfg.weights.as_ref())?;
            if cfg.lookback < 2 {
                return Err(ScoringError::Validation(
                    "FearIndex lookback must span at least 2 slices".to_string(),
                ));
            }
            if cfg.gap_threshold <= 0.0 {
                return Err(ScoringError::Validation(
                    "FearIndex gap_threshold must be positive".to_string(),
                ));
            }
        }
        if let Some(cfg) = &self.market_flow {
            cfg.thresholds.validate("MarketFlow")?;
            validate_method("MarketFlow", &cfg.method, cfg.weights.as_ref())?;
            if cfg.lookback < 2 {
                return Err(ScoringError::Validation(
                    "MarketFlow lookback must span at least 2 slices".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &str) -> anyhow::Result<ScoringConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ScoringConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a TOML file.
pub fn save_config(config: &ScoringConfig, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Write a commented configuration template. The thresholds and method in
/// the template are examples the operator must confirm, not defaults the
/// core would ever assume.
pub fn create_config_template(path: &str) -> anyhow::Result<()> {
    let template = "# Trust scoring configuration
# Each organism section is mandatory for that organism to be scored.
# Thresholds, weights and aggregation method are operator decisions:
# leaving them out makes the core report the missing decision rather
# than invent one.

[unslug]
# Rolling window for the mean-distance and regime factors
lookback = 20
# Lift-off window for the rebound factor
rebound_window = 5
# Position-in-range agreement windows for the consistency factor
consistency_windows = [5, 10, 20]
# Session volume at which the liquidity factor saturates
min_volume = 1000000.0

[unslug.method]
kind = \"geometric\"

[unslug.thresholds]
# trust >= high suggests BUY, >= mid NEUTRAL, below mid RISK
high = 0.7
mid = 0.4

# Optional anchored retracement-band scan
# [unslug.reference_band]
# anchor_start = \"2020-02-15T00:00:00Z\"
# anchor_end = \"2020-04-15T00:00:00Z\"
# hit_lookback = 30
# tolerance_pct = 3.0

[fear_index]
lookback = 20
# Overnight gap (fraction of prior close) counted as a gap event
gap_threshold = 0.02

[fear_index.method]
kind = \"geometric\"

[fear_index.thresholds]
# FearIndex is inverted: trust >= high suggests RISK, below mid BUY
high = 0.7
mid = 0.4

# Optional seven-component psychology gauge
# [fear_index.gauge]
# momentum_ma = 125
# strength_window = 252
# breadth_window = 20
# rv_window = 20
# rv_ref_window = 50
# safehaven_window = 20

[market_flow]
lookback = 10

[market_flow.method]
kind = \"geometric\"

[market_flow.thresholds]
high = 0.7
mid = 0.4
";

    std::fs::write(path, template)?;
    Ok(())
}
