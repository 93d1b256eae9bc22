// City visualization token
// Pure per-organism floor tests; no cross-organism blending at this boundary

use crate::error::FlowError;
use common::{CityState, CityView};
use serde::{Deserialize, Serialize};
use trust_scoring::ScoringError;

/// Per-organism trust floors the city classification tests against. This is
/// an operator decision: there is no default consensus rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CityPolicy {
    /// Every organism trust must clear this for the city to thrive.
    pub thriving_floor: f64,
    /// Every organism trust must clear this for the city to hold stable.
    pub stable_floor: f64,
}

impl CityPolicy {
    fn validate(&self) -> Result<(), FlowError> {
        let ok = (0.0..=1.0).contains(&self.stable_floor)
            && (0.0..=1.0).contains(&self.thriving_floor)
            && self.stable_floor <= self.thriving_floor;
        if !ok {
            return Err(FlowError::Scoring(ScoringError::Validation(format!(
                "city policy floors must satisfy 0 <= stable <= thriving <= 1, got stable={} thriving={}",
                self.stable_floor, self.thriving_floor
            ))));
        }
        Ok(())
    }
}

/// Build the city token from the three per-organism trusts. The state is a
/// conjunction of per-organism floor tests — each trust is compared on its
/// own, never blended into a composite score. A missing policy is a missing
/// decision, not a default.
pub fn city_view(
    unslug_trust: f64,
    fear_trust: f64,
    flow_trust: f64,
    policy: Option<&CityPolicy>,
    notes: Option<String>,
) -> Result<CityView, FlowError> {
    let policy = policy.ok_or_else(|| {
        FlowError::Scoring(ScoringError::RequiredDecision(
            "city consensus policy (per-organism floors)".to_string(),
        ))
    })?;
    policy.validate()?;

    let trusts = [unslug_trust, fear_trust, flow_trust];
    let city_state = if trusts.iter().all(|t| *t >= policy.thriving_floor) {
        CityState::Thriving
    } else if trusts.iter().all(|t| *t >= policy.stable_floor) {
        CityState::Stable
    } else {
        CityState::Dim
    };

    Ok(CityView {
        city_state,
        unslug_trust,
        fear_trust,
        flow_trust,
        notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CityPolicy {
        CityPolicy {
            thriving_floor: 0.7,
            stable_floor: 0.4,
        }
    }

    #[test]
    fn test_missing_policy_is_required_decision() {
        let err = city_view(0.8, 0.8, 0.8, None, None).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Scoring(ScoringError::RequiredDecision(_))
        ));
    }

    #[test]
    fn test_all_floors_cleared_thrives() {
        let view = city_view(0.8, 0.75, 0.9, Some(&policy()), None).unwrap();
        assert_eq!(view.city_state, CityState::Thriving);
        assert_eq!(view.unslug_trust, 0.8);
    }

    #[test]
    fn test_one_weak_organism_blocks_thriving() {
        // conjunction, not an average: two high trusts cannot carry a low one
        let view = city_view(0.95, 0.95, 0.45, Some(&policy()), None).unwrap();
        assert_eq!(view.city_state, CityState::Stable);
    }

    #[test]
    fn test_below_stable_floor_dims() {
        let view = city_view(0.9, 0.2, 0.9, Some(&policy()), None).unwrap();
        assert_eq!(view.city_state, CityState::Dim);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let bad = CityPolicy {
            thriving_floor: 0.3,
            stable_floor: 0.6,
        };
        assert!(city_view(0.5, 0.5, 0.5, Some(&bad), None).is_err());
    }
}
