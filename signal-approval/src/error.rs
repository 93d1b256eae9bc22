use crate::records::SignalStatus;
use thiserror::Error;
use trust_scoring::ScoringError;
use uuid::Uuid;

/// Errors raised by the signal/approval flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The record is already in a terminal state and the requested status
    /// conflicts with it. The original status is left untouched.
    #[error("signal {signal_id} already approved as {current:?}")]
    AlreadyApproved {
        signal_id: Uuid,
        current: SignalStatus,
    },

    #[error("signal {0} not found")]
    SignalNotFound(Uuid),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    /// The injected data source failed or returned nothing usable.
    #[error("data source error: {0}")]
    Source(String),

    /// The injected persistence backend failed.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
