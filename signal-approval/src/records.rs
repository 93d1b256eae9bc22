// Persisted signal and approval records
// The wire/storage contract consumed by transport and UI collaborators

use chrono::{DateTime, Utc};
use common::{ExplainEntry, SignalKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a signal record. `PendingReview` is the only
/// non-terminal state; an approved record is never reopened — the next
/// batch cycle creates a fresh record instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStatus {
    #[serde(rename = "PENDING_REVIEW")]
    PendingReview,
    #[serde(rename = "APPROVED_BUY")]
    ApprovedBuy,
    #[serde(rename = "APPROVED_NEUTRAL")]
    ApprovedNeutral,
    #[serde(rename = "APPROVED_RISK")]
    ApprovedRisk,
}

impl SignalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SignalStatus::PendingReview)
    }

    /// Terminal status for an approved signal kind.
    pub fn approved_from(kind: SignalKind) -> Self {
        match kind {
            SignalKind::Buy => SignalStatus::ApprovedBuy,
            SignalKind::Neutral => SignalStatus::ApprovedNeutral,
            SignalKind::Risk => SignalStatus::ApprovedRisk,
        }
    }

    /// The signal kind a terminal status locked in, if any.
    pub fn approved_kind(&self) -> Option<SignalKind> {
        match self {
            SignalStatus::PendingReview => None,
            SignalStatus::ApprovedBuy => Some(SignalKind::Buy),
            SignalStatus::ApprovedNeutral => Some(SignalKind::Neutral),
            SignalStatus::ApprovedRisk => Some(SignalKind::Risk),
        }
    }
}

/// Suggested action plus the reasoning the UI shows next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub suggested: SignalKind,
    pub logic: String,
}

/// One persisted signal snapshot for a symbol. Created `PendingReview` by
/// each batch cycle; approval is per snapshot, not per symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: Uuid,
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub unslug_score: Option<f64>,
    pub fear_score: Option<f64>,
    pub flow_score: Option<f64>,
    pub combined_trust: Option<f64>,
    pub signal: SignalKind,
    pub trust: f64,
    pub status: SignalStatus,
    pub explain: Vec<ExplainEntry>,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SignalRecord {
    /// Fresh pending record for this cycle's snapshot.
    pub fn pending(
        symbol: impl Into<String>,
        ts: DateTime<Utc>,
        signal: SignalKind,
        trust: f64,
        recommendation: Recommendation,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            ts,
            unslug_score: None,
            fear_score: None,
            flow_score: None,
            combined_trust: None,
            signal,
            trust,
            status: SignalStatus::PendingReview,
            explain: Vec::new(),
            recommendation,
            meta: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }
}

/// A single approval event against one signal record. Append-only; the
/// rows for a symbol over time form its audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub symbol: String,
    /// `None` means a system approval.
    pub approved_by: Option<String>,
    pub approved_status: SignalKind,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What an approver submits against a pending record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub status: SignalKind,
    pub approved_by: Option<String>,
    pub note: Option<String>,
}
