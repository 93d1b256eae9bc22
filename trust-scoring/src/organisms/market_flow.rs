//! MarketFlow: participation and liquidity flow.
//!
//! Reads whether money is moving through the instrument and which way it
//! leans. The regime factor tags the window as momentum-driven or
//! mean-reverting from the autocorrelation of returns.

use crate::config::MarketFlowConfig;
use crate::error::Result;
use crate::normalize::{clamp_unit, logistic, mean, simple_returns};
use crate::organisms::{Extraction, Factor};
use common::InputSlice;
use serde_json::json;
use tracing::debug;

pub const FACTOR_TURNOVER_ACCEL: &str = "turnover_accel";
pub const FACTOR_BREADTH: &str = "breadth";
pub const FACTOR_DIRECTIONAL_BIAS: &str = "directional_bias";
pub const FACTOR_REGIME_ALIGNMENT: &str = "regime_alignment";

/// The organism's factor whitelist.
pub const FACTORS: &[&str] = &[
    FACTOR_TURNOVER_ACCEL,
    FACTOR_BREADTH,
    FACTOR_DIRECTIONAL_BIAS,
    FACTOR_REGIME_ALIGNMENT,
];

pub const REGIME_MOMENTUM: &str = "momentum";
pub const REGIME_MEAN_REVERSION: &str = "mean_reversion";

/// Lag-1 autocorrelation; `None` when the returns carry no variance.
fn lag1_autocorrelation(returns: &[f64]) -> Option<f64> {
    if returns.len() < 3 {
        return None;
    }
    let m = mean(returns);
    let denom: f64 = returns.iter().map(|r| (r - m).powi(2)).sum();
    if denom < 1e-18 {
        return None;
    }
    let num: f64 = returns
        .windows(2)
        .map(|w| (w[0] - m) * (w[1] - m))
        .sum();
    Some((num / denom).clamp(-1.0, 1.0))
}

pub fn extract(cfg: &MarketFlowConfig, series: &[InputSlice]) -> Result<Extraction> {
    let volumes: Vec<f64> = series.iter().map(|s| s.volume).collect();
    let closes: Vec<f64> = series.iter().map(|s| s.close).collect();
    let window = cfg.lookback.min(series.len());
    let returns = simple_returns(&closes[closes.len() - window..]);
    let mut factors = Vec::new();
    let mut meta = serde_json::Map::new();

    // Turnover acceleration: recent half of the window against the prior
    // half, on a log scale so a 1:1 ratio sits at 0.5.
    let half = cfg.lookback / 2;
    if half >= 1 && volumes.len() >= cfg.lookback {
        let n = volumes.len();
        let recent = mean(&volumes[n - half..]);
        let prior = mean(&volumes[n - 2 * half..n - half]);
        if prior > 0.0 {
            let ratio = recent / prior;
            factors.push(Factor::new(
                FACTOR_TURNOVER_ACCEL,
                ratio,
                logistic(ratio.ln(), 1.0),
            ));
        } else if recent > 0.0 {
            factors.push(Factor::new(FACTOR_TURNOVER_ACCEL, f64::INFINITY, 1.0));
        }
    } else {
        debug!(
            have = volumes.len(),
            need = cfg.lookback,
            "omitting turnover_accel factor"
        );
    }

    // Breadth proxy: share of advancing sessions in the window.
    if !returns.is_empty() {
        let up = returns.iter().filter(|r| **r > 0.0).count() as f64;
        let fraction = up / returns.len() as f64;
        factors.push(Factor::new(FACTOR_BREADTH, fraction, fraction));
    }

    // Directional bias: cumulative signed volume over total volume.
    if series.len() >= 2 {
        let tail = &series[series.len() - window..];
        let mut signed = 0.0;
        let mut total = 0.0;
        for pair in tail.windows(2) {
            let sign = (pair[1].close - pair[0].close).signum();
            signed += sign * pair[1].volume;
            total += pair[1].volume;
        }
        if total > 0.0 {
            let bias = (signed / total).clamp(-1.0, 1.0);
            factors.push(Factor::new(
                FACTOR_DIRECTIONAL_BIAS,
                bias,
                clamp_unit((bias + 1.0) / 2.0),
            ));
        }
    }

    // Momentum-vs-mean-reversion regime from return autocorrelation.
    if let Some(rho) = lag1_autocorrelation(&returns) {
        factors.push(Factor::new(
            FACTOR_REGIME_ALIGNMENT,
            rho,
            clamp_unit((rho + 1.0) / 2.0),
        ));
        let tag = if rho >= 0.0 {
            REGIME_MOMENTUM
        } else {
            REGIME_MEAN_REVERSION
        };
        meta.insert("regime".to_string(), json!(tag));
    }

    let meta = if meta.is_empty() {
        None
    } else {
        Some(json!(meta))
    };
    Ok((factors, meta))
}
