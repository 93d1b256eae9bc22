// Trust scoring core (Layer 1)
// Normalizes raw market observations into [0,1] factors, aggregates them
// monotonically into a trust score, and maps trust to a suggested signal

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod explain;
pub mod normalize;
pub mod organisms;

pub use aggregate::{AggregationMethod, TrustScoreBuilder, WEIGHT_TOLERANCE};
pub use config::{
    create_config_template, load_config, save_config, FearGaugeConfig, FearIndexConfig,
    MarketFlowConfig, ReferenceBandConfig, ScoringConfig, SignalThresholds, UnslugConfig,
};
pub use engine::{suggest_signal, ScoringEngine};
pub use error::{Result, ScoringError};
pub use explain::{build_explain, contribution_for};
pub use organisms::{fear_gauge, fear_index, market_flow, reference_band, unslug, Factor};
