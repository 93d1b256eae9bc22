// Shared data model (Layer 0)
// Types exchanged between the scoring core, the approval flow, and collaborators

pub mod types;

pub use types::{
    CityState, CityView, ExplainEntry, ExplainValue, InputSlice, Interval, InvalidSlice,
    OrganismKind, OrganismOutput, SignalKind, TrustContribution, FEATURE_LIQUIDITY_RATIO,
    FEATURE_ROLLING_VOL, FEATURE_RSI, FEATURE_SENTIMENT, FEATURE_VWAP_DEVIATION,
};
