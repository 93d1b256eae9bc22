//! FearIndex: market stress read from one instrument's own tape.
//!
//! High trust here means high fear. The engine inverts the signal mapping
//! for this organism: a confident fear read leans RISK, a calm one BUY.

use crate::config::FearIndexConfig;
use crate::error::Result;
use crate::normalize::{clamp_unit, percentile_rank, simple_returns, stddev};
use crate::organisms::{fear_gauge, Extraction, Factor};
use common::{InputSlice, FEATURE_SENTIMENT};
use serde_json::json;
use tracing::debug;

pub const FACTOR_VOLATILITY: &str = "volatility";
pub const FACTOR_DRAWDOWN: &str = "drawdown";
pub const FACTOR_GAP_FREQUENCY: &str = "gap_frequency";
pub const FACTOR_SENTIMENT: &str = "sentiment";
pub const FACTOR_PSYCHOLOGY: &str = "psychology";

/// The organism's factor whitelist. `sentiment` appears only when the
/// feature map carries it; `psychology` only when the gauge is configured.
pub const FACTORS: &[&str] = &[
    FACTOR_VOLATILITY,
    FACTOR_DRAWDOWN,
    FACTOR_GAP_FREQUENCY,
    FACTOR_SENTIMENT,
    FACTOR_PSYCHOLOGY,
];

pub fn extract(cfg: &FearIndexConfig, series: &[InputSlice]) -> Result<Extraction> {
    let Some(latest) = series.last() else {
        return Ok((Vec::new(), None));
    };
    let closes: Vec<f64> = series.iter().map(|s| s.close).collect();
    let returns = simple_returns(&closes);
    let mut factors = Vec::new();
    let mut meta = serde_json::Map::new();

    // Realized-volatility percentile: where does the current vol sit in the
    // window's own history?
    if returns.len() >= cfg.lookback {
        let vols: Vec<f64> = (cfg.lookback..=returns.len())
            .map(|i| stddev(&returns[i - cfg.lookback..i]))
            .collect();
        if let Some(p) = percentile_rank(&vols) {
            factors.push(Factor::new(FACTOR_VOLATILITY, vols[vols.len() - 1], p));
        }
    } else {
        let omitted = crate::error::ScoringError::InsufficientHistory {
            factor: FACTOR_VOLATILITY,
            needed: cfg.lookback,
            have: returns.len(),
        };
        debug!(%omitted, "factor omitted");
    }

    // Drawdown-depth percentile against the window's running peak.
    if closes.len() >= cfg.lookback {
        let window = &closes[closes.len() - cfg.lookback..];
        let mut peak = f64::NEG_INFINITY;
        let drawdowns: Vec<f64> = window
            .iter()
            .map(|c| {
                peak = peak.max(*c);
                if peak > 0.0 {
                    1.0 - c / peak
                } else {
                    0.0
                }
            })
            .collect();
        if let Some(p) = percentile_rank(&drawdowns) {
            factors.push(Factor::new(
                FACTOR_DRAWDOWN,
                drawdowns[drawdowns.len() - 1],
                p,
            ));
        }
    } else {
        debug!(
            have = closes.len(),
            need = cfg.lookback,
            "omitting drawdown factor"
        );
    }

    // Overnight gap frequency over the window.
    if series.len() >= 2 {
        let pairs = (series.len() - 1).min(cfg.lookback);
        let start = series.len() - pairs;
        let gaps = (start..series.len())
            .filter(|&i| {
                let prev_close = series[i - 1].close;
                prev_close > 0.0
                    && ((series[i].open - prev_close) / prev_close).abs() > cfg.gap_threshold
            })
            .count();
        factors.push(Factor::new(
            FACTOR_GAP_FREQUENCY,
            gaps as f64,
            gaps as f64 / pairs as f64,
        ));
    }

    // Sentiment polarity from the feature map, mapped onto the fear scale:
    // -1 (panic) -> 1.0, +1 (euphoria) -> 0.0. Absent feature, absent factor.
    if let Some(s) = latest.feature(FEATURE_SENTIMENT) {
        if s.is_finite() {
            let polarity = s.clamp(-1.0, 1.0);
            factors.push(Factor::new(
                FACTOR_SENTIMENT,
                polarity,
                clamp_unit((1.0 - polarity) / 2.0),
            ));
        }
    }

    // Seven-component gauge, when configured. The gauge reads greed high, so
    // the fear factor is its complement.
    if let Some(gauge_cfg) = &cfg.gauge {
        match fear_gauge::compute(gauge_cfg, series, &fear_gauge::GaugeInputs::default()) {
            Ok(reading) => {
                factors.push(Factor::new(
                    FACTOR_PSYCHOLOGY,
                    reading.score,
                    clamp_unit(1.0 - reading.unit_score()),
                ));
                meta.insert("psychology_gauge".to_string(), reading.to_json());
            }
            Err(e) => debug!(symbol = %latest.symbol, error = %e, "psychology gauge skipped"),
        }
    }

    let meta = if meta.is_empty() {
        None
    } else {
        Some(json!(meta))
    };
    Ok((factors, meta))
}
