//! Anchored retracement-band scan.
//!
//! Finds the reference low inside the configured anchor window, the peak
//! that followed it, and reads the current close against the 23.6% / 38.2%
//! retracement levels of that move. Prices camped in the lower band are the
//! accumulation zone the UNSLUG organism is hunting for.

use crate::config::ReferenceBandConfig;
use crate::normalize::clamp_unit;
use chrono::{DateTime, Utc};
use common::InputSlice;
use serde_json::json;

/// Retracement band the current close falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    BelowAnchor,
    Accumulation,
    Retracement,
    Recovered,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::BelowAnchor => "Below 0%",
            Band::Accumulation => "0-23.6%",
            Band::Retracement => "23.6-38.2%",
            Band::Recovered => "Above 38.2%",
        }
    }
}

/// Result of one band scan against a slice window.
#[derive(Debug, Clone)]
pub struct BandScan {
    pub band: Band,
    pub anchor_low: f64,
    pub anchor_low_ts: DateTime<Utc>,
    pub anchor_high: f64,
    pub anchor_high_ts: DateTime<Utc>,
    pub fib_23_6: f64,
    pub fib_38_2: f64,
    pub current: f64,
    /// Position of the close within [anchor_low, fib_38_2], clamped to [0, 1].
    pub position: f64,
    pub near_23_6: bool,
    pub hits: usize,
    pub first_hit: Option<DateTime<Utc>>,
}

impl BandScan {
    /// Band factor value: deepest discounts inside the band score highest,
    /// a close hugging the 23.6% level still counts, a recovered price has
    /// little rebound left to catch.
    pub fn position_score(&self) -> f64 {
        match self.band {
            Band::Accumulation | Band::Retracement => 0.9 - 0.4 * self.position,
            Band::BelowAnchor => 0.5,
            Band::Recovered if self.near_23_6 => 0.75,
            Band::Recovered => 0.25,
        }
    }

    /// Hit-count factor: half the lookback window spent inside the band
    /// saturates the score.
    pub fn hits_score(&self, hit_lookback: usize) -> f64 {
        if hit_lookback == 0 {
            return 0.0;
        }
        clamp_unit(2.0 * self.hits as f64 / hit_lookback as f64)
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "band": self.band.as_str(),
            "anchor_low": self.anchor_low,
            "anchor_low_ts": self.anchor_low_ts,
            "anchor_high": self.anchor_high,
            "anchor_high_ts": self.anchor_high_ts,
            "fib_23_6": self.fib_23_6,
            "fib_38_2": self.fib_38_2,
            "current": self.current,
            "position": self.position,
            "near_23_6": self.near_23_6,
            "hits": self.hits,
            "first_hit": self.first_hit,
        })
    }
}

/// Retracement level `pct` percent up from `low` toward `high`.
pub fn fib_level(low: f64, high: f64, pct: f64) -> f64 {
    if high <= low {
        return low;
    }
    low + (high - low) * (pct / 100.0)
}

/// Scan a window for the anchor pattern. Returns `None` when no slice falls
/// inside the anchor window or no higher peak follows the trough; the caller
/// then simply contributes no band factors.
pub fn scan(cfg: &ReferenceBandConfig, series: &[InputSlice]) -> Option<BandScan> {
    let (trough_idx, trough) = series
        .iter()
        .enumerate()
        .filter(|(_, s)| s.ts >= cfg.anchor_start && s.ts <= cfg.anchor_end)
        .min_by(|a, b| {
            a.1.low
                .partial_cmp(&b.1.low)
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

    let peak = series[trough_idx..].iter().max_by(|a, b| {
        a.high
            .partial_cmp(&b.high)
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;

    let low = trough.low;
    let high = peak.high;
    if high <= low {
        return None;
    }

    let fib_23_6 = fib_level(low, high, 23.6);
    let fib_38_2 = fib_level(low, high, 38.2);
    let current = series.last()?.close;

    let band = if current < low {
        Band::BelowAnchor
    } else if current <= fib_23_6 {
        Band::Accumulation
    } else if current <= fib_38_2 {
        Band::Retracement
    } else {
        Band::Recovered
    };

    let near_23_6 =
        (current - fib_23_6).abs() <= ((cfg.tolerance_pct / 100.0) * (high - low)).max(1e-9);

    let tail = &series[series.len().saturating_sub(cfg.hit_lookback)..];
    let mut hits = 0;
    let mut first_hit = None;
    for slice in tail {
        if slice.close >= low && slice.close <= fib_38_2 {
            hits += 1;
            if first_hit.is_none() {
                first_hit = Some(slice.ts);
            }
        }
    }

    Some(BandScan {
        band,
        anchor_low: low,
        anchor_low_ts: trough.ts,
        anchor_high: high,
        anchor_high_ts: peak.ts,
        fib_23_6,
        fib_38_2,
        current,
        position: clamp_unit((current - low) / (fib_38_2 - low)),
        near_23_6,
        hits,
        first_hit,
    })
}
