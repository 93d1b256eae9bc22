// Explainability entries: per-factor contribution tags, ranked for the UI

use crate::organisms::Factor;
use common::{ExplainEntry, ExplainValue, TrustContribution};

/// Neutral baseline a factor is compared against.
pub const BASELINE: f64 = 0.5;

/// Values within this distance of the baseline count as neutral.
pub const NEUTRAL_EPSILON: f64 = 1e-9;

/// Contribution tag for a normalized factor value.
pub fn contribution_for(value: f64) -> TrustContribution {
    if (value - BASELINE).abs() <= NEUTRAL_EPSILON {
        TrustContribution::Neutral
    } else if value > BASELINE {
        TrustContribution::IncreasesTrust
    } else {
        TrustContribution::DecreasesTrust
    }
}

/// Build the ordered explain list for a set of consumed factors: one entry
/// per factor, most influential (farthest from the baseline) first, so the
/// UI can rank without recomputing anything.
pub fn build_explain(factors: &[Factor]) -> Vec<ExplainEntry> {
    let mut entries: Vec<(f64, ExplainEntry)> = factors
        .iter()
        .map(|f| {
            (
                (f.value - BASELINE).abs(),
                ExplainEntry {
                    name: f.name.to_string(),
                    value: ExplainValue::Number(f.value),
                    contribution: contribution_for(f.value),
                },
            )
        })
        .collect();
    entries.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    entries.into_iter().map(|(_, e)| e).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contribution_tags() {
        assert_eq!(contribution_for(0.9), TrustContribution::IncreasesTrust);
        assert_eq!(contribution_for(0.1), TrustContribution::DecreasesTrust);
        assert_eq!(contribution_for(0.5), TrustContribution::Neutral);
        assert_eq!(
            contribution_for(0.5 + NEUTRAL_EPSILON / 2.0),
            TrustContribution::Neutral
        );
    }

    #[test]
    fn test_ordered_by_influence() {
        let factors = vec![
            Factor::new("mild", 0.55, 0.55),
            Factor::new("strong", 0.95, 0.95),
            Factor::new("weak_link", 0.1, 0.1),
        ];
        let entries = build_explain(&factors);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["strong", "weak_link", "mild"]);
    }

    #[test]
    fn test_entry_carries_normalized_value() {
        let entries = build_explain(&[Factor::new("liquidity", 2_000_000.0, 1.0)]);
        assert_eq!(entries[0].value, ExplainValue::Number(1.0));
        assert_eq!(entries[0].contribution, TrustContribution::IncreasesTrust);
    }
}
