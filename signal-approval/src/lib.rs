// Signal & approval flow (Layer 2)
// Persists trust-scored signal snapshots behind a human approval gate

pub mod approval;
pub mod city;
pub mod combined;
pub mod error;
pub mod pipeline;
pub mod records;
pub mod store;

pub use approval::{apply_approval, ApprovalOutcome};
pub use city::{city_view, CityPolicy};
pub use combined::combined_trust;
pub use error::{FlowError, Result};
pub use pipeline::{
    CycleSummary, PipelineConfig, RecommendationPolicy, ScoringPipeline, SliceSource,
    SymbolFailure,
};
pub use records::{
    ApprovalRecord, ApprovalRequest, Recommendation, SignalRecord, SignalStatus,
};
pub use store::{InMemorySignalStore, SignalStore, StoreStats};
