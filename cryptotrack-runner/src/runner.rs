//! Batch runner — wires together config, data loading, the engine and metrics.
//!
//! Two entry points:
//! - `run_from_config()`: loads every configured input into a store, then
//!   builds every (partition, strategy) job. Used by the CLI.
//! - `run_batch()`: builds a list of jobs against an already-loaded engine.
//!
//! A failing job is recorded in its outcome and never aborts the batch.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use cryptotrack_core::domain::{PartitionKey, SimulationKey, StrategyId};
use cryptotrack_core::engine::{BuildReport, SimulationEngine};
use cryptotrack_core::store::MarketStore;
use cryptotrack_core::SimulationError;

use crate::config::{ConfigError, RunId, SimulationConfig};
use crate::data_loader::{load_into_store, LoadError};
use crate::metrics::PerformanceSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Result of one (partition, strategy) build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub key: SimulationKey,
    pub strategy_name: String,
    pub report: Option<BuildReport>,
    pub error: Option<String>,
    /// One summary per ledger owner with a non-empty ledger.
    pub performance: Vec<PerformanceSummary>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_some()
    }
}

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: RunId,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Every (partition, strategy) pair, partitions outermost.
pub fn plan_jobs(partitions: &[PartitionKey], strategies: &[StrategyId]) -> Vec<SimulationKey> {
    partitions
        .iter()
        .flat_map(|p| strategies.iter().map(move |&s| SimulationKey::new(p.clone(), s)))
        .collect()
}

/// Build every job, optionally on the rayon pool. Outcomes keep job order.
pub fn run_batch(engine: &SimulationEngine, jobs: &[SimulationKey], parallel: bool) -> Vec<JobOutcome> {
    if parallel {
        jobs.par_iter().map(|key| run_job(engine, key)).collect()
    } else {
        jobs.iter().map(|key| run_job(engine, key)).collect()
    }
}

fn run_job(engine: &SimulationEngine, key: &SimulationKey) -> JobOutcome {
    let strategy_name = engine
        .registry()
        .resolve(key.strategy)
        .map(|d| d.name.clone())
        .unwrap_or_else(|_| key.strategy.to_string());

    match engine.build_signals(&key.partition, key.strategy) {
        Ok(report) => {
            let candles = engine.store().candles(&key.partition);
            let performance = engine
                .owners()
                .iter()
                .filter_map(|owner| {
                    PerformanceSummary::compute(&engine.store().ledger(key, owner), &candles)
                })
                .collect();
            JobOutcome {
                key: key.clone(),
                strategy_name,
                report: Some(report),
                error: None,
                performance,
            }
        }
        Err(e) => {
            warn!(key = %key, error = %e, "build failed");
            JobOutcome {
                key: key.clone(),
                strategy_name,
                report: None,
                error: Some(e.to_string()),
                performance: Vec::new(),
            }
        }
    }
}

/// Load every configured input into `store` and build the configured jobs.
pub fn run_from_config(
    config: &SimulationConfig,
    store: Arc<MarketStore>,
) -> Result<BatchReport, RunError> {
    let run_id = config.run_id()?;
    let registry = config.registry()?;
    let strategies = config.strategy_ids(&registry)?;

    let loaded = load_into_store(config, &store)?;
    let engine = SimulationEngine::with_registry(store, registry).with_owners(config.ledger_owners());

    let jobs = plan_jobs(&loaded.partitions, &strategies);
    let outcomes = run_batch(&engine, &jobs, config.parallel);

    let report = BatchReport {
        run_id,
        dataset_hash: loaded.dataset_hash,
        has_synthetic: loaded.has_synthetic,
        outcomes,
    };
    info!(
        run_id = %report.run_id,
        jobs = jobs.len(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        synthetic = report.has_synthetic,
        "batch complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use cryptotrack_core::domain::PriceCandle;
    use rust_decimal::Decimal;

    fn seeded_engine() -> SimulationEngine {
        let store = Arc::new(MarketStore::new());
        let key = PartitionKey::new("BTC", "USD", "1d", "test").unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles = [100, 120, 90, 130]
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let c = Decimal::from(close);
                PriceCandle {
                    partition: key.clone(),
                    timestamp: start + Duration::days(i as i64),
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    volume: Decimal::ONE,
                    sentiment_date: None,
                }
            })
            .collect();
        store.replace_candles(&key, candles).unwrap();
        SimulationEngine::new(store)
    }

    #[test]
    fn plan_is_cross_product() {
        let a = PartitionKey::new("BTC", "USD", "1d", "x").unwrap();
        let b = PartitionKey::new("ETH", "USD", "1d", "x").unwrap();
        let jobs = plan_jobs(&[a.clone(), b], &[StrategyId(1), StrategyId(3)]);
        assert_eq!(jobs.len(), 4);
        assert_eq!(jobs[1], SimulationKey::new(a, StrategyId(3)));
    }

    #[test]
    fn failed_job_does_not_abort_batch() {
        let engine = seeded_engine();
        let good = engine.store().partitions()[0].clone();
        let missing = PartitionKey::new("DOGE", "USD", "1d", "test").unwrap();
        let jobs = vec![
            SimulationKey::new(missing, StrategyId(3)),
            SimulationKey::new(good, StrategyId(3)),
        ];
        let outcomes = run_batch(&engine, &jobs, false);
        assert!(!outcomes[0].is_success());
        assert!(outcomes[0].error.is_some());
        assert!(outcomes[1].is_success());
        assert_eq!(outcomes[1].strategy_name, "hindsight");
        assert_eq!(outcomes[1].performance.len(), 1);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let engine = seeded_engine();
        let partition = engine.store().partitions()[0].clone();
        let jobs = plan_jobs(&[partition], &engine.registry().ids());

        let sequential = run_batch(&engine, &jobs, false);
        let parallel = run_batch(&engine, &jobs, true);
        for (s, p) in sequential.iter().zip(&parallel) {
            assert_eq!(s.key, p.key);
            assert_eq!(s.report, p.report);
        }
    }
}
