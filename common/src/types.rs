use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Well-known keys for the optional per-slice feature map.
pub const FEATURE_RSI: &str = "rsi";
pub const FEATURE_VWAP_DEVIATION: &str = "vwap_deviation";
pub const FEATURE_ROLLING_VOL: &str = "rolling_vol";
pub const FEATURE_LIQUIDITY_RATIO: &str = "liquidity_ratio";
pub const FEATURE_SENTIMENT: &str = "sentiment";

/// Sampling interval of an input series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "5m")]
    Minute5,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day1 => "1d",
            Interval::Hour1 => "1h",
            Interval::Minute5 => "5m",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a slice violates the OHLCV invariant
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid input slice for {symbol} at {ts}: {reason}")]
pub struct InvalidSlice {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub reason: String,
}

/// One sampled observation of an instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSlice {
    pub symbol: String,
    pub interval: Interval,
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adj_close: Option<f64>,
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

impl InputSlice {
    /// Check the OHLCV invariant: `low <= open,close <= high`, `volume >= 0`,
    /// all values finite. Violating slices are dropped before factor extraction.
    pub fn validate(&self) -> Result<(), InvalidSlice> {
        let err = |reason: String| InvalidSlice {
            symbol: self.symbol.clone(),
            ts: self.ts,
            reason,
        };

        let values = [self.open, self.high, self.low, self.close, self.volume];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(err("non-finite OHLCV value".to_string()));
        }
        if self.low > self.high {
            return Err(err(format!("low {} above high {}", self.low, self.high)));
        }
        if self.open < self.low || self.open > self.high {
            return Err(err(format!("open {} outside [low, high]", self.open)));
        }
        if self.close < self.low || self.close > self.high {
            return Err(err(format!("close {} outside [low, high]", self.close)));
        }
        if self.volume < 0.0 {
            return Err(err(format!("negative volume {}", self.volume)));
        }
        Ok(())
    }

    /// Typical price used as a VWAP building block
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Look up an optional feature value
    pub fn feature(&self, key: &str) -> Option<f64> {
        self.features.get(key).copied()
    }
}

/// Independent scoring organism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrganismKind {
    #[serde(rename = "UNSLUG")]
    Unslug,
    #[serde(rename = "FearIndex")]
    FearIndex,
    #[serde(rename = "MarketFlow")]
    MarketFlow,
}

impl OrganismKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganismKind::Unslug => "UNSLUG",
            OrganismKind::FearIndex => "FearIndex",
            OrganismKind::MarketFlow => "MarketFlow",
        }
    }
}

impl fmt::Display for OrganismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested action for an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "NEUTRAL")]
    Neutral,
    #[serde(rename = "RISK")]
    Risk,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Buy => "BUY",
            SignalKind::Neutral => "NEUTRAL",
            SignalKind::Risk => "RISK",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction a factor pushed the trust score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustContribution {
    IncreasesTrust,
    DecreasesTrust,
    Neutral,
}

/// Value attached to an explain entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExplainValue {
    Number(f64),
    Text(String),
}

/// One factor's contribution to a trust score, for UI ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainEntry {
    pub name: String,
    pub value: ExplainValue,
    pub contribution: TrustContribution,
}

/// Result of one organism computation. Created once per cycle, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganismOutput {
    pub organism: OrganismKind,
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub signal: SignalKind,
    pub trust: f64,
    pub explain: Vec<ExplainEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// City visualization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CityState {
    Dim,
    Stable,
    Thriving,
}

/// City-level visualization token exposed to the UI. Carries the three
/// per-organism trusts untouched; no cross-organism blending happens here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityView {
    pub city_state: CityState,
    pub unslug_trust: f64,
    pub fear_trust: f64,
    pub flow_trust: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
