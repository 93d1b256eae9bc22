// Batch scoring pipeline
// Scores a symbol universe per cycle and persists one pending signal record
// per symbol; a single symbol's failure never aborts the batch

use crate::combined::combined_trust;
use crate::error::FlowError;
use crate::records::{Recommendation, SignalRecord, SignalStatus};
use crate::store::SignalStore;
use async_trait::async_trait;
use common::{ExplainEntry, InputSlice, Interval, OrganismKind, OrganismOutput, SignalKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use trust_scoring::{ScoringEngine, ScoringError};
use uuid::Uuid;

/// Injected data source. May fail or return a short/empty window; the
/// pipeline treats either as that symbol's problem, not the batch's.
#[async_trait]
pub trait SliceSource: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        lookback: usize,
    ) -> anyhow::Result<Vec<InputSlice>>;
}

/// Configured rule mapping the two gated organism trusts to a recommended
/// action. The cutoffs are operator decisions with no defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPolicy {
    pub buy_min_unslug: f64,
    pub buy_min_fear: f64,
    pub risk_max_unslug: f64,
    pub risk_max_fear: f64,
}

impl RecommendationPolicy {
    pub fn suggest(&self, unslug_trust: f64, fear_trust: f64) -> SignalKind {
        if unslug_trust >= self.buy_min_unslug && fear_trust >= self.buy_min_fear {
            SignalKind::Buy
        } else if unslug_trust < self.risk_max_unslug || fear_trust < self.risk_max_fear {
            SignalKind::Risk
        } else {
            SignalKind::Neutral
        }
    }
}

/// Configuration for the batch cycle
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Enable/disable the whole pipeline
    pub enabled: bool,
    pub interval: Interval,
    /// Slices requested per symbol
    pub lookback: usize,
    /// Soft time target for one cycle; overruns are logged, never cancelled
    pub soft_deadline_ms: Option<u64>,
    /// Recommendation rule; absent means no signal can be emitted
    pub recommendation: Option<RecommendationPolicy>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Interval::Day1,
            lookback: 60,
            soft_deadline_ms: Some(60_000),
            recommendation: None,
        }
    }
}

/// One symbol that produced no signal this cycle, with the reason (a missing
/// decision is named here rather than papered over).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

/// Outcome of one batch cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub records: Vec<Uuid>,
    pub failures: Vec<SymbolFailure>,
    pub elapsed_ms: u128,
    pub deadline_exceeded: bool,
}

/// Batch scoring pipeline over an injected source and store.
pub struct ScoringPipeline {
    engine: ScoringEngine,
    source: Arc<dyn SliceSource>,
    store: Arc<dyn SignalStore>,
    config: PipelineConfig,
}

impl ScoringPipeline {
    pub fn new(
        engine: ScoringEngine,
        source: Arc<dyn SliceSource>,
        store: Arc<dyn SignalStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            engine,
            source,
            store,
            config,
        }
    }

    /// Score every symbol in the universe and persist one PENDING_REVIEW
    /// record per success. Each symbol is computed independently; failures
    /// are collected, logged, and skipped.
    pub async fn run_cycle(&self, symbols: &[String]) -> CycleSummary {
        if !self.config.enabled {
            debug!("pipeline disabled, skipping cycle");
            return CycleSummary::default();
        }

        let started = Instant::now();
        let mut summary = CycleSummary::default();

        for symbol in symbols {
            match self.score_symbol(symbol).await {
                Ok(record) => {
                    info!(
                        symbol = %symbol,
                        signal_id = %record.id,
                        trust = record.trust,
                        suggested = %record.recommendation.suggested,
                        "signal recorded"
                    );
                    summary.records.push(record.id);
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "symbol skipped");
                    summary.failures.push(SymbolFailure {
                        symbol: symbol.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis();
        summary.deadline_exceeded = self
            .config
            .soft_deadline_ms
            .map_or(false, |d| summary.elapsed_ms > u128::from(d));
        if summary.deadline_exceeded {
            warn!(
                elapsed_ms = summary.elapsed_ms,
                "cycle overran its soft deadline"
            );
        }
        info!(
            scored = summary.records.len(),
            skipped = summary.failures.len(),
            elapsed_ms = summary.elapsed_ms,
            "cycle complete"
        );
        summary
    }

    /// Score one symbol: fetch its window, run the gated organisms, fuse
    /// combined trust, and persist a fresh pending record.
    pub async fn score_symbol(&self, symbol: &str) -> Result<SignalRecord, FlowError> {
        let series = self
            .source
            .fetch(symbol, self.config.interval, self.config.lookback)
            .await
            .map_err(|e| FlowError::Source(e.to_string()))?;

        let unslug = self.engine.compute_trust(OrganismKind::Unslug, &series)?;
        let fear = self.engine.compute_trust(OrganismKind::FearIndex, &series)?;
        let flow = if self.engine.config().market_flow.is_some() {
            match self.engine.compute_trust(OrganismKind::MarketFlow, &series) {
                Ok(output) => Some(output),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "market flow skipped");
                    None
                }
            }
        } else {
            None
        };

        let policy = self.config.recommendation.as_ref().ok_or_else(|| {
            FlowError::Scoring(ScoringError::RequiredDecision(
                "signal recommendation policy".to_string(),
            ))
        })?;

        let combined = combined_trust(unslug.trust, fear.trust);
        let suggested = policy.suggest(unslug.trust, fear.trust);
        let recommendation = Recommendation {
            suggested,
            logic: format!(
                "unslug={:.3}, fear={:.3}, combined={:.3}",
                unslug.trust, fear.trust, combined
            ),
        };

        let record = SignalRecord {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            ts: unslug.ts,
            unslug_score: Some(unslug.trust),
            fear_score: Some(fear.trust),
            flow_score: flow.as_ref().map(|o| o.trust),
            combined_trust: Some(combined),
            signal: suggested,
            trust: combined,
            status: SignalStatus::PendingReview,
            explain: merged_explain(&unslug, &fear, flow.as_ref()),
            recommendation,
            meta: cycle_meta(&unslug, &fear, flow.as_ref()),
            created_at: chrono::Utc::now(),
        };

        self.store.save_signal(&record).await?;
        Ok(record)
    }
}

/// Explain entries from every organism that contributed, in organism order.
fn merged_explain(
    unslug: &OrganismOutput,
    fear: &OrganismOutput,
    flow: Option<&OrganismOutput>,
) -> Vec<ExplainEntry> {
    let mut entries = unslug.explain.clone();
    entries.extend(fear.explain.iter().cloned());
    if let Some(flow) = flow {
        entries.extend(flow.explain.iter().cloned());
    }
    entries
}

fn cycle_meta(
    unslug: &OrganismOutput,
    fear: &OrganismOutput,
    flow: Option<&OrganismOutput>,
) -> serde_json::Value {
    json!({
        "signals": {
            "UNSLUG": unslug.signal,
            "FearIndex": fear.signal,
            "MarketFlow": flow.map(|o| o.signal),
        },
        "organism_meta": {
            "UNSLUG": unslug.meta.clone(),
            "FearIndex": fear.meta.clone(),
            "MarketFlow": flow.and_then(|o| o.meta.clone()),
        },
    })
}
