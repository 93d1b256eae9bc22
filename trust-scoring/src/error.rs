use common::InvalidSlice;
use thiserror::Error;

/// Errors raised by the scoring core.
///
/// Factor-level problems (`InsufficientHistory`) are absorbed by omitting the
/// factor; aggregation- and configuration-level problems propagate to the
/// caller, who must not fabricate a trust score in their place.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// A numeric or configuration choice is undefined upstream. Surfaced,
    /// never guessed.
    #[error("required decision is undefined: {0}")]
    RequiredDecision(String),

    /// An input slice violated the OHLCV invariant.
    #[error(transparent)]
    InvalidSlice(#[from] InvalidSlice),

    /// No valid slices remained after validation.
    #[error("input series is empty after validation")]
    EmptySeries,

    /// The window is too short for a factor. Absorbed by omission.
    #[error("insufficient history for factor {factor}: need {needed}, have {have}")]
    InsufficientHistory {
        factor: &'static str,
        needed: usize,
        have: usize,
    },

    /// Aggregation was attempted over an empty factor set.
    #[error("no factors available for aggregation")]
    InsufficientFactors,

    /// A caller-asserted factor is outside the [0, 1] contract.
    #[error("factor {name} outside [0, 1]: {value}")]
    FactorOutOfRange { name: String, value: f64 },

    /// The same factor name was added twice to one builder.
    #[error("factor {0} added twice")]
    DuplicateFactor(String),

    /// The builder was used after `compute()` finalized it.
    #[error("trust score builder already finalized")]
    BuilderFinalized,

    /// Weighted aggregation received unusable weights.
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// A configuration value is structurally invalid.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ScoringError>;
