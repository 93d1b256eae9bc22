// Signal persistence contract
// Storage backends implement this narrow interface; the in-memory store is
// the development/test backend and the reference for approval atomicity

use crate::approval::{apply_approval, ApprovalOutcome};
use crate::error::FlowError;
use crate::records::{ApprovalRecord, ApprovalRequest, SignalRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Trait for signal/approval storage backends.
///
/// `approve` is the one write path that mutates an existing record: it must
/// apply the state machine atomically per record so concurrent approvals
/// resolve first-writer-wins.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Persist a new signal record.
    async fn save_signal(&self, record: &SignalRecord) -> Result<(), FlowError>;

    /// Fetch a signal record by id.
    async fn get_signal(&self, id: Uuid) -> Result<Option<SignalRecord>, FlowError>;

    /// Fetch the most recent signal record for a symbol.
    async fn latest_signal(&self, symbol: &str) -> Result<Option<SignalRecord>, FlowError>;

    /// Apply an approval to a record and persist the resulting audit row.
    /// Returns the record as it stands after the call.
    async fn approve(
        &self,
        signal_id: Uuid,
        request: &ApprovalRequest,
    ) -> Result<SignalRecord, FlowError>;

    /// Persist an externally produced approval row.
    async fn save_approval(&self, record: &ApprovalRecord) -> Result<(), FlowError>;

    /// Approval audit trail for a symbol, oldest first.
    async fn list_approvals(&self, symbol: &str) -> Result<Vec<ApprovalRecord>, FlowError>;

    /// Storage statistics.
    async fn stats(&self) -> Result<StoreStats, FlowError>;
}

/// Storage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_signals: usize,
    pub pending_signals: usize,
    pub total_approvals: usize,
    pub newest_signal: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct StoreInner {
    signals: HashMap<Uuid, SignalRecord>,
    approvals: Vec<ApprovalRecord>,
}

/// In-memory signal storage (for testing and development). A single lock
/// guards both maps, so approval transitions and their audit rows land
/// together and later writers see the terminal state.
#[derive(Default)]
pub struct InMemorySignalStore {
    inner: tokio::sync::RwLock<StoreInner>,
}

impl InMemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignalStore for InMemorySignalStore {
    async fn save_signal(&self, record: &SignalRecord) -> Result<(), FlowError> {
        let mut inner = self.inner.write().await;
        inner.signals.insert(record.id, record.clone());
        debug!(signal_id = %record.id, symbol = %record.symbol, "signal saved");
        Ok(())
    }

    async fn get_signal(&self, id: Uuid) -> Result<Option<SignalRecord>, FlowError> {
        let inner = self.inner.read().await;
        Ok(inner.signals.get(&id).cloned())
    }

    async fn latest_signal(&self, symbol: &str) -> Result<Option<SignalRecord>, FlowError> {
        let inner = self.inner.read().await;
        Ok(inner
            .signals
            .values()
            .filter(|r| r.symbol == symbol)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn approve(
        &self,
        signal_id: Uuid,
        request: &ApprovalRequest,
    ) -> Result<SignalRecord, FlowError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .signals
            .get_mut(&signal_id)
            .ok_or(FlowError::SignalNotFound(signal_id))?;
        let outcome = apply_approval(record, request, Utc::now())?;
        let record = record.clone();
        if let ApprovalOutcome::Applied(approval) = outcome {
            debug!(
                signal_id = %signal_id,
                status = %approval.approved_status,
                "approval applied"
            );
            inner.approvals.push(approval);
        }
        Ok(record)
    }

    async fn save_approval(&self, record: &ApprovalRecord) -> Result<(), FlowError> {
        let mut inner = self.inner.write().await;
        inner.approvals.push(record.clone());
        Ok(())
    }

    async fn list_approvals(&self, symbol: &str) -> Result<Vec<ApprovalRecord>, FlowError> {
        let inner = self.inner.read().await;
        Ok(inner
            .approvals
            .iter()
            .filter(|a| a.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats, FlowError> {
        let inner = self.inner.read().await;
        Ok(StoreStats {
            total_signals: inner.signals.len(),
            pending_signals: inner
                .signals
                .values()
                .filter(|r| !r.status.is_terminal())
                .count(),
            total_approvals: inner.approvals.len(),
            newest_signal: inner.signals.values().map(|r| r.created_at).max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Recommendation, SignalStatus};
    use common::SignalKind;
    use std::sync::Arc;

    fn record(symbol: &str) -> SignalRecord {
        SignalRecord::pending(
            symbol,
            Utc::now(),
            SignalKind::Buy,
            0.8,
            Recommendation {
                suggested: SignalKind::Buy,
                logic: "test".to_string(),
            },
        )
    }

    fn request(status: SignalKind) -> ApprovalRequest {
        ApprovalRequest {
            status,
            approved_by: Some("analyst-1".to_string()),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemorySignalStore::new();
        let rec = record("AAPL");
        store.save_signal(&rec).await.unwrap();
        let got = store.get_signal(rec.id).await.unwrap().unwrap();
        assert_eq!(got.id, rec.id);
        assert_eq!(got.status, SignalStatus::PendingReview);
    }

    #[tokio::test]
    async fn test_latest_signal_per_symbol() {
        let store = InMemorySignalStore::new();
        let older = record("AAPL");
        store.save_signal(&older).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = record("AAPL");
        store.save_signal(&newer).await.unwrap();
        store.save_signal(&record("TSLA")).await.unwrap();
        let latest = store.latest_signal("AAPL").await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
        assert!(store.latest_signal("MSFT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_approve_transitions_and_audits() {
        let store = InMemorySignalStore::new();
        let rec = record("NVDA");
        store.save_signal(&rec).await.unwrap();
        let approved = store.approve(rec.id, &request(SignalKind::Buy)).await.unwrap();
        assert_eq!(approved.status, SignalStatus::ApprovedBuy);
        let trail = store.list_approvals("NVDA").await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].signal_id, rec.id);
    }

    #[tokio::test]
    async fn test_conflicting_approval_rejected_status_unchanged() {
        let store = InMemorySignalStore::new();
        let rec = record("NVDA");
        store.save_signal(&rec).await.unwrap();
        store.approve(rec.id, &request(SignalKind::Buy)).await.unwrap();
        let err = store
            .approve(rec.id, &request(SignalKind::Risk))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::AlreadyApproved { .. }));
        let got = store.get_signal(rec.id).await.unwrap().unwrap();
        assert_eq!(got.status, SignalStatus::ApprovedBuy);
        // no second audit row for the failed attempt
        assert_eq!(store.list_approvals("NVDA").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_matching_reapproval_is_idempotent() {
        let store = InMemorySignalStore::new();
        let rec = record("SPY");
        store.save_signal(&rec).await.unwrap();
        store.approve(rec.id, &request(SignalKind::Neutral)).await.unwrap();
        let again = store
            .approve(rec.id, &request(SignalKind::Neutral))
            .await
            .unwrap();
        assert_eq!(again.status, SignalStatus::ApprovedNeutral);
        assert_eq!(store.list_approvals("SPY").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_approvals_first_writer_wins() {
        let store = Arc::new(InMemorySignalStore::new());
        let rec = record("QQQ");
        store.save_signal(&rec).await.unwrap();

        let buy_store = Arc::clone(&store);
        let risk_store = Arc::clone(&store);
        let id = rec.id;
        let (buy, risk) = tokio::join!(
            tokio::spawn(async move { buy_store.approve(id, &request(SignalKind::Buy)).await }),
            tokio::spawn(async move { risk_store.approve(id, &request(SignalKind::Risk)).await }),
        );
        let results = [buy.unwrap(), risk.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(FlowError::AlreadyApproved { .. })))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 1);
        // exactly one audit row, matching the surviving status
        let trail = store.list_approvals("QQQ").await.unwrap();
        assert_eq!(trail.len(), 1);
        let record = store.get_signal(id).await.unwrap().unwrap();
        assert_eq!(
            record.status.approved_kind().unwrap(),
            trail[0].approved_status
        );
    }

    #[tokio::test]
    async fn test_approve_unknown_signal() {
        let store = InMemorySignalStore::new();
        let err = store
            .approve(Uuid::new_v4(), &request(SignalKind::Buy))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::SignalNotFound(_)));
    }

    #[tokio::test]
    async fn test_stats() {
        let store = InMemorySignalStore::new();
        let a = record("AAPL");
        let b = record("TSLA");
        store.save_signal(&a).await.unwrap();
        store.save_signal(&b).await.unwrap();
        store.approve(a.id, &request(SignalKind::Buy)).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_signals, 2);
        assert_eq!(stats.pending_signals, 1);
        assert_eq!(stats.total_approvals, 1);
        assert!(stats.newest_signal.is_some());
    }
}
