//! UNSLUG: rebound evidence in beaten-down instruments.
//!
//! Looks for prices lifting off a low with enough liquidity to act on.
//! Discounts below the volume-weighted mean raise trust; the optional
//! reference-band scan anchors the read to a configured historical low.

use crate::config::UnslugConfig;
use crate::error::Result;
use crate::normalize::{graded_floor, logistic, mean, rolling_minmax, stddev};
use crate::organisms::{reference_band, Extraction, Factor};
use common::InputSlice;
use serde_json::json;
use tracing::debug;

pub const FACTOR_REBOUND: &str = "rebound";
pub const FACTOR_DISTANCE_TO_MEAN: &str = "distance_to_mean";
pub const FACTOR_LIQUIDITY_FLOOR: &str = "liquidity_floor";
pub const FACTOR_REGIME: &str = "regime";
pub const FACTOR_CONSISTENCY: &str = "consistency";
pub const FACTOR_BAND_POSITION: &str = "band_position";
pub const FACTOR_BAND_HITS: &str = "band_hits";

/// The organism's factor whitelist. Band factors appear only when the
/// reference-band scan is configured and its anchor pattern is found.
pub const FACTORS: &[&str] = &[
    FACTOR_REBOUND,
    FACTOR_DISTANCE_TO_MEAN,
    FACTOR_LIQUIDITY_FLOOR,
    FACTOR_REGIME,
    FACTOR_CONSISTENCY,
    FACTOR_BAND_POSITION,
    FACTOR_BAND_HITS,
];

/// Volume-weighted typical price over a window; falls back to the plain
/// mean of typical prices when the window traded no volume.
fn vwap(window: &[InputSlice]) -> f64 {
    let total_volume: f64 = window.iter().map(|s| s.volume).sum();
    if total_volume <= 0.0 {
        let typicals: Vec<f64> = window.iter().map(InputSlice::typical_price).collect();
        return mean(&typicals);
    }
    window
        .iter()
        .map(|s| s.typical_price() * s.volume)
        .sum::<f64>()
        / total_volume
}

pub fn extract(cfg: &UnslugConfig, series: &[InputSlice]) -> Result<Extraction> {
    let Some(latest) = series.last() else {
        return Ok((Vec::new(), None));
    };
    let closes: Vec<f64> = series.iter().map(|s| s.close).collect();
    let mut factors = Vec::new();
    let mut meta = serde_json::Map::new();

    // Lift off the trailing floor over the short rebound window.
    if closes.len() >= cfg.rebound_window {
        if let Some(pos) = rolling_minmax(&closes, cfg.rebound_window) {
            factors.push(Factor::new(FACTOR_REBOUND, latest.close, pos));
        }
    } else {
        let omitted = crate::error::ScoringError::InsufficientHistory {
            factor: FACTOR_REBOUND,
            needed: cfg.rebound_window,
            have: closes.len(),
        };
        debug!(%omitted, "factor omitted");
    }

    // Z-distance of the close from the rolling VWAP; discounts raise trust.
    if series.len() >= cfg.lookback {
        let window = &series[series.len() - cfg.lookback..];
        let window_closes = &closes[closes.len() - cfg.lookback..];
        let anchor = vwap(window);
        let sd = stddev(window_closes);
        let z = if sd < 1e-12 {
            0.0
        } else {
            (latest.close - anchor) / sd
        };
        factors.push(Factor::new(FACTOR_DISTANCE_TO_MEAN, z, logistic(-z, 1.0)));
    } else {
        let omitted = crate::error::ScoringError::InsufficientHistory {
            factor: FACTOR_DISTANCE_TO_MEAN,
            needed: cfg.lookback,
            have: series.len(),
        };
        debug!(%omitted, "factor omitted");
    }

    // A rebound nobody can trade is no rebound.
    factors.push(Factor::new(
        FACTOR_LIQUIDITY_FLOOR,
        latest.volume,
        graded_floor(latest.volume, cfg.min_volume),
    ));

    // Regime context: share of the window spent above its own mean.
    if closes.len() >= cfg.lookback {
        let window = &closes[closes.len() - cfg.lookback..];
        let m = mean(window);
        let above = window.iter().filter(|c| **c > m).count() as f64;
        let fraction = above / window.len() as f64;
        factors.push(Factor::new(FACTOR_REGIME, fraction, fraction));
    }

    // Agreement of the position-in-range read across lookback horizons.
    let positions: Vec<f64> = cfg
        .consistency_windows
        .iter()
        .filter(|w| closes.len() >= **w)
        .filter_map(|w| rolling_minmax(&closes, *w))
        .collect();
    if positions.len() >= 2 {
        let hi = positions.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let lo = positions.iter().cloned().fold(f64::INFINITY, f64::min);
        let spread = hi - lo;
        factors.push(Factor::new(FACTOR_CONSISTENCY, spread, 1.0 - spread));
    } else {
        debug!(
            windows = positions.len(),
            "omitting consistency factor, not enough horizons"
        );
    }

    if let Some(band_cfg) = &cfg.reference_band {
        if let Some(scan) = reference_band::scan(band_cfg, series) {
            factors.push(Factor::new(
                FACTOR_BAND_POSITION,
                scan.position,
                scan.position_score(),
            ));
            factors.push(Factor::new(
                FACTOR_BAND_HITS,
                scan.hits as f64,
                scan.hits_score(band_cfg.hit_lookback),
            ));
            meta.insert("reference_band".to_string(), scan.to_json());
        } else {
            debug!(symbol = %latest.symbol, "reference band anchor pattern not found");
        }
    }

    let meta = if meta.is_empty() {
        None
    } else {
        Some(json!(meta))
    };
    Ok((factors, meta))
}
