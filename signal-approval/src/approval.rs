// Approval state machine
// PENDING_REVIEW -> APPROVED_* exactly once, first writer wins

use crate::error::FlowError;
use crate::records::{ApprovalRecord, ApprovalRequest, SignalRecord, SignalStatus};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Result of applying an approval to a record.
#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    /// The record transitioned; the audit row to persist.
    Applied(ApprovalRecord),
    /// The record was already approved with the same status. Idempotent:
    /// no transition, no new audit row.
    AlreadyApplied,
}

/// Apply one approval event to a signal record.
///
/// Pure: callers provide the clock, storage backends provide atomicity (the
/// record must be held exclusively while this runs). A pending record
/// transitions and yields an audit row. A terminal record accepts a matching
/// re-approval as a no-op and rejects a conflicting one with
/// [`FlowError::AlreadyApproved`], leaving the original status in place.
pub fn apply_approval(
    record: &mut SignalRecord,
    request: &ApprovalRequest,
    now: DateTime<Utc>,
) -> Result<ApprovalOutcome, FlowError> {
    match record.status.approved_kind() {
        None => {
            record.status = SignalStatus::approved_from(request.status);
            Ok(ApprovalOutcome::Applied(ApprovalRecord {
                id: Uuid::new_v4(),
                signal_id: record.id,
                symbol: record.symbol.clone(),
                approved_by: request.approved_by.clone(),
                approved_status: request.status,
                note: request.note.clone(),
                created_at: now,
            }))
        }
        Some(kind) if kind == request.status => Ok(ApprovalOutcome::AlreadyApplied),
        Some(_) => Err(FlowError::AlreadyApproved {
            signal_id: record.id,
            current: record.status,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Recommendation;
    use common::SignalKind;

    fn pending_record() -> SignalRecord {
        SignalRecord::pending(
            "AAPL",
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
            note: Some("looks right".to_string()),
        }
    }

    #[test]
    fn test_first_approval_transitions_and_records() {
        let mut record = pending_record();
        let now = Utc::now();
        let outcome = apply_approval(&mut record, &request(SignalKind::Buy), now).unwrap();
        assert_eq!(record.status, SignalStatus::ApprovedBuy);
        match outcome {
            ApprovalOutcome::Applied(approval) => {
                assert_eq!(approval.signal_id, record.id);
                assert_eq!(approval.approved_status, SignalKind::Buy);
                assert_eq!(approval.approved_by.as_deref(), Some("analyst-1"));
                assert_eq!(approval.created_at, now);
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[test]
    fn test_conflicting_second_approval_fails_and_preserves_status() {
        let mut record = pending_record();
        apply_approval(&mut record, &request(SignalKind::Buy), Utc::now()).unwrap();
        let err = apply_approval(&mut record, &request(SignalKind::Risk), Utc::now()).unwrap_err();
        match err {
            FlowError::AlreadyApproved { current, .. } => {
                assert_eq!(current, SignalStatus::ApprovedBuy)
            }
            other => panic!("expected AlreadyApproved, got {other:?}"),
        }
        assert_eq!(record.status, SignalStatus::ApprovedBuy);
    }

    #[test]
    fn test_matching_second_approval_is_idempotent() {
        let mut record = pending_record();
        apply_approval(&mut record, &request(SignalKind::Neutral), Utc::now()).unwrap();
        let outcome =
            apply_approval(&mut record, &request(SignalKind::Neutral), Utc::now()).unwrap();
        assert!(matches!(outcome, ApprovalOutcome::AlreadyApplied));
        assert_eq!(record.status, SignalStatus::ApprovedNeutral);
    }
}
