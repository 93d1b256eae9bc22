//! Seven-component single-instrument psychology gauge.
//!
//! Each component lands on a [0, 100] scale where low readings mean fear and
//! high readings mean greed; the gauge score is the mean of whatever
//! components the inputs support. Auxiliary series (safe-haven closes,
//! credit spreads, short-interest ratios) are injected by the caller; a
//! component with no data is skipped, never mocked.

use crate::config::FearGaugeConfig;
use crate::error::{Result, ScoringError};
use crate::normalize::{clamp_unit, mean, percentile_rank, simple_returns, stddev};
use common::{ExplainEntry, ExplainValue, InputSlice, TrustContribution};
use serde_json::json;

pub const COMPONENT_MOMENTUM: &str = "momentum";
pub const COMPONENT_STRENGTH: &str = "strength";
pub const COMPONENT_BREADTH: &str = "breadth";
pub const COMPONENT_VOLATILITY: &str = "volatility";
pub const COMPONENT_SAFEHAVEN: &str = "safehaven";
pub const COMPONENT_CREDIT: &str = "credit";
pub const COMPONENT_SHORT_SENTIMENT: &str = "short_sentiment";

/// Inputs for one gauge computation. Auxiliary series are aligned to the
/// tail of the price window by the caller.
#[derive(Debug, Clone, Default)]
pub struct GaugeInputs<'a> {
    pub safehaven_close: Option<&'a [f64]>,
    pub credit_spread: Option<&'a [f64]>,
    pub short_ratio: Option<&'a [f64]>,
}

/// Psychology regime for a gauge score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl Regime {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Regime::ExtremeGreed
        } else if score >= 55.0 {
            Regime::Greed
        } else if score <= 30.0 {
            Regime::ExtremeFear
        } else if score <= 45.0 {
            Regime::Fear
        } else {
            Regime::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Regime::ExtremeFear => "Extreme Fear",
            Regime::Fear => "Fear",
            Regime::Neutral => "Neutral",
            Regime::Greed => "Greed",
            Regime::ExtremeGreed => "Extreme Greed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentScore {
    pub name: &'static str,
    pub score: f64,
}

/// One gauge computation: the composite score, the components that fed it,
/// and the regime label.
#[derive(Debug, Clone)]
pub struct GaugeReading {
    pub score: f64,
    pub components: Vec<ComponentScore>,
    pub regime: Regime,
}

impl GaugeReading {
    /// Rescale the [0, 100] psychology score onto the [0, 1] factor contract.
    pub fn unit_score(&self) -> f64 {
        clamp_unit(self.score / 100.0)
    }

    /// Per-component entries for the explain list, on the gauge's own scale.
    pub fn explain(&self) -> Vec<ExplainEntry> {
        self.components
            .iter()
            .map(|c| ExplainEntry {
                name: c.name.to_string(),
                value: ExplainValue::Number(c.score),
                contribution: if c.score > 60.0 {
                    TrustContribution::IncreasesTrust
                } else if c.score < 40.0 {
                    TrustContribution::DecreasesTrust
                } else {
                    TrustContribution::Neutral
                },
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "score": self.score,
            "regime": self.regime.label(),
            "components": self.components
                .iter()
                .map(|c| json!({"name": c.name, "score": c.score}))
                .collect::<Vec<_>>(),
        })
    }
}

fn pct100(values: &[f64]) -> Option<f64> {
    percentile_rank(values).map(|p| p * 100.0)
}

/// Annualized realized volatility of each `window`-length tail of `returns`.
fn rolling_vol(returns: &[f64], window: usize) -> Vec<f64> {
    if returns.len() < window {
        return Vec::new();
    }
    (window..=returns.len())
        .map(|i| stddev(&returns[i - window..i]) * (252.0f64).sqrt())
        .collect()
}

pub fn compute(cfg: &FearGaugeConfig, series: &[InputSlice], inputs: &GaugeInputs<'_>) -> Result<GaugeReading> {
    let closes: Vec<f64> = series.iter().map(|s| s.close).collect();
    let volumes: Vec<f64> = series.iter().map(|s| s.volume).collect();
    let returns = simple_returns(&closes);
    let mut components = Vec::new();

    // 1) Momentum: close vs its moving average, ranked over the window.
    if closes.len() >= cfg.momentum_ma {
        let ratios: Vec<f64> = (cfg.momentum_ma..=closes.len())
            .filter_map(|i| {
                let ma = mean(&closes[i - cfg.momentum_ma..i]);
                (ma > 0.0).then(|| closes[i - 1] / ma)
            })
            .collect();
        if let Some(score) = pct100(&ratios) {
            components.push(ComponentScore {
                name: COMPONENT_MOMENTUM,
                score,
            });
        }
    }

    // 2) Strength: position within the long-range window.
    if closes.len() >= cfg.strength_window {
        let tail = &closes[closes.len() - cfg.strength_window..];
        let lo = tail.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = tail.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let score = if (hi - lo).abs() < 1e-12 {
            50.0
        } else {
            100.0 * (closes[closes.len() - 1] - lo) / (hi - lo)
        };
        components.push(ComponentScore {
            name: COMPONENT_STRENGTH,
            score: score.clamp(0.0, 100.0),
        });
    }

    // 3) Breadth: signed-volume accumulation delta, ranked.
    if closes.len() > cfg.breadth_window {
        let mut obv = Vec::with_capacity(closes.len());
        let mut acc = 0.0;
        obv.push(acc);
        for i in 1..closes.len() {
            let sign = (closes[i] - closes[i - 1]).signum();
            acc += sign * volumes[i];
            obv.push(acc);
        }
        let deltas: Vec<f64> = (cfg.breadth_window..obv.len())
            .map(|i| obv[i] - obv[i - cfg.breadth_window])
            .collect();
        if let Some(score) = pct100(&deltas) {
            components.push(ComponentScore {
                name: COMPONENT_BREADTH,
                score,
            });
        }
    }

    // 4) Volatility: short-vs-reference realized-vol ratio, inverted so
    // elevated near-term volatility reads as fear.
    if returns.len() >= cfg.rv_ref_window {
        let short = rolling_vol(&returns, cfg.rv_window);
        let reference = rolling_vol(&returns, cfg.rv_ref_window);
        let offset = short.len().saturating_sub(reference.len());
        let ratios: Vec<f64> = reference
            .iter()
            .enumerate()
            .filter_map(|(i, rv_ref)| {
                (*rv_ref > 1e-12).then(|| short[i + offset] / rv_ref)
            })
            .collect();
        if let Some(p) = pct100(&ratios) {
            components.push(ComponentScore {
                name: COMPONENT_VOLATILITY,
                score: 100.0 - p,
            });
        }
    }

    // 5) Safe haven: relative performance against the injected haven series.
    if let Some(haven) = inputs.safehaven_close {
        let n = closes.len().min(haven.len());
        let w = cfg.safehaven_window;
        if n > w {
            let own = &closes[closes.len() - n..];
            let hav = &haven[haven.len() - n..];
            let rel: Vec<f64> = (w..n)
                .filter_map(|i| {
                    (own[i - w] > 0.0 && hav[i - w] > 0.0).then(|| {
                        (own[i] / own[i - w] - 1.0) - (hav[i] / hav[i - w] - 1.0)
                    })
                })
                .collect();
            if let Some(score) = pct100(&rel) {
                components.push(ComponentScore {
                    name: COMPONENT_SAFEHAVEN,
                    score,
                });
            }
        }
    }

    // 6) Credit proxy: wide spreads mean fear, so invert the rank.
    if let Some(spreads) = inputs.credit_spread {
        if spreads.len() >= 2 {
            if let Some(p) = pct100(spreads) {
                components.push(ComponentScore {
                    name: COMPONENT_CREDIT,
                    score: 100.0 - p,
                });
            }
        }
    }

    // 7) Short sentiment: heavy shorting means fear, inverted rank.
    if let Some(ratios) = inputs.short_ratio {
        if ratios.len() >= 2 {
            if let Some(p) = pct100(ratios) {
                components.push(ComponentScore {
                    name: COMPONENT_SHORT_SENTIMENT,
                    score: 100.0 - p,
                });
            }
        }
    }

    if components.is_empty() {
        return Err(ScoringError::InsufficientFactors);
    }

    let score = components.iter().map(|c| c.score).sum::<f64>() / components.len() as f64;
    let score = score.clamp(0.0, 100.0);
    Ok(GaugeReading {
        score,
        regime: Regime::from_score(score),
        components,
    })
}
