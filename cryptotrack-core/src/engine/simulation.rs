//! Simulation engine — the build and read operations over a [`MarketStore`].
//!
//! A build run for one (partition, strategy) key goes through four phases:
//!
//! 1. Resolve: look up the strategy and partition. Failures here leave the
//!    store untouched.
//! 2. Build: fold the candle snapshot into a signal sequence.
//! 3. Replay: derive one ledger per configured owner from the full sequence.
//! 4. Commit: swap the new signals and ledgers in under one write lock.
//!
//! Runs over the same key are serialized by the store's run lock.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError};
use tracing::info;

use super::builder::build_sequence;
use super::ledger::{replay, resolve_hold};
use crate::domain::{
    LedgerEntry, LedgerOwner, PartitionKey, RunDigest, Signal, SignalRecord, SimulationKey,
    StrategyId,
};
use crate::error::SimulationError;
use crate::store::MarketStore;
use crate::strategy::StrategyRegistry;

/// Outcome of one committed build run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub key: SimulationKey,
    pub records_written: usize,
    pub skipped_gaps: usize,
    pub skipped_insufficient: usize,
    pub ledger_entries: usize,
    /// Hash of the committed signals and ledgers. Equal inputs, equal digest.
    pub digest: RunDigest,
}

/// One signal record joined with its candles, as returned by `get_signal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalView {
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub period_close: Decimal,
    pub comparison_period_close: Option<Decimal>,
    pub signal: Option<Signal>,
    pub resolved_signal: Signal,
    pub sentiment_ratio: Option<Decimal>,
    pub strategy_name: String,
}

pub struct SimulationEngine {
    store: Arc<MarketStore>,
    registry: StrategyRegistry,
    owners: Vec<LedgerOwner>,
}

impl SimulationEngine {
    /// Engine over the built-in strategies with the default ledger owner.
    pub fn new(store: Arc<MarketStore>) -> Self {
        Self::with_registry(store, StrategyRegistry::builtin())
    }

    pub fn with_registry(store: Arc<MarketStore>, registry: StrategyRegistry) -> Self {
        Self {
            store,
            registry,
            owners: vec![LedgerOwner::default()],
        }
    }

    /// Replace the set of owners a ledger is simulated for. Duplicates are
    /// collapsed; an empty list falls back to the default owner.
    pub fn with_owners(mut self, owners: impl IntoIterator<Item = LedgerOwner>) -> Self {
        let mut owners: Vec<LedgerOwner> = owners.into_iter().collect();
        owners.sort();
        owners.dedup();
        if owners.is_empty() {
            owners.push(LedgerOwner::default());
        }
        self.owners = owners;
        self
    }

    pub fn store(&self) -> &Arc<MarketStore> {
        &self.store
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn owners(&self) -> &[LedgerOwner] {
        &self.owners
    }

    /// Rebuild the signals and ledgers of `partition` under `strategy`.
    pub fn build_signals(
        &self,
        partition: &PartitionKey,
        strategy: StrategyId,
    ) -> Result<BuildReport, SimulationError> {
        let def = self.registry.resolve(strategy)?;
        if !self.store.partitions().contains(partition) {
            return Err(SimulationError::configuration(format!(
                "no candles loaded for partition {partition}"
            )));
        }
        let key = SimulationKey::new(partition.clone(), strategy);

        let lock = self.store.run_lock(&key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let inputs = self.store.inputs_for(&key);
        let sequence = build_sequence(def, &inputs)?;

        let mut ledgers = BTreeMap::new();
        for owner in &self.owners {
            let entries = replay(&key, owner, &sequence.records, &inputs)?;
            ledgers.insert(owner.clone(), entries);
        }

        let digest = digest(&sequence.records, &ledgers);
        let ledger_entries = ledgers.values().map(Vec::len).sum();
        let report = BuildReport {
            key: key.clone(),
            records_written: sequence.records_written(),
            skipped_gaps: sequence.skipped_gaps,
            skipped_insufficient: sequence.skipped_insufficient,
            ledger_entries,
            digest,
        };
        self.store
            .commit_run(&key, inputs.generation, sequence.records, ledgers)
            .map_err(|_| SimulationError::StaleInputs {
                partition: partition.to_string(),
                strategy,
            })?;

        info!(
            key = %key,
            strategy = %def.name,
            records = report.records_written,
            gaps = report.skipped_gaps,
            insufficient = report.skipped_insufficient,
            digest = %report.digest,
            "signals rebuilt"
        );
        Ok(report)
    }

    /// Rebuild every registered strategy for `partition`, in id order.
    ///
    /// Stops at the first failing strategy; earlier strategies stay committed.
    pub fn build_all(&self, partition: &PartitionKey) -> Result<Vec<BuildReport>, SimulationError> {
        self.registry
            .ids()
            .into_iter()
            .map(|id| self.build_signals(partition, id))
            .collect()
    }

    /// The last record on `date`, or the latest record carrying a computed
    /// signal. Intraday partitions have several records per date.
    pub fn get_signal(
        &self,
        partition: &PartitionKey,
        strategy: StrategyId,
        date: Option<NaiveDate>,
    ) -> Result<SignalView, SimulationError> {
        let def = self.registry.resolve(strategy)?;
        let key = SimulationKey::new(partition.clone(), strategy);
        let records = self.store.signals(&key);
        let resolved = resolve_all(&records);

        let not_found = || SimulationError::NotFound {
            partition: partition.to_string(),
            strategy,
            date,
        };
        let index = match date {
            Some(d) => records
                .iter()
                .rposition(|r| r.timestamp.date_naive() == d)
                .ok_or_else(not_found)?,
            None => records
                .iter()
                .rposition(|r| r.signal.is_some())
                .ok_or_else(not_found)?,
        };
        let record = &records[index];

        let inputs = self.store.inputs_for(&key);
        let candle = inputs.candle_at(record.timestamp).ok_or_else(|| {
            SimulationError::Consistency {
                partition: partition.to_string(),
                strategy,
                timestamp: record.timestamp,
                reason: "record references a candle not in the partition".into(),
            }
        })?;

        Ok(SignalView {
            date: candle.date(),
            timestamp: record.timestamp,
            period_close: candle.close,
            comparison_period_close: record
                .comparison
                .and_then(|ts| inputs.candle_at(ts))
                .map(|c| c.close),
            signal: record.signal,
            resolved_signal: resolved[index],
            sentiment_ratio: inputs.sentiment_ratio(candle),
            strategy_name: def.name.clone(),
        })
    }

    /// Committed ledger of `owner` under (`partition`, `strategy`).
    pub fn get_ledger(
        &self,
        partition: &PartitionKey,
        strategy: StrategyId,
        owner: &LedgerOwner,
    ) -> Result<Vec<LedgerEntry>, SimulationError> {
        self.registry.resolve(strategy)?;
        let key = SimulationKey::new(partition.clone(), strategy);
        Ok(self.store.ledger(&key, owner))
    }
}

/// Resolved signal of every record, in the records' (ascending) order.
fn resolve_all(records: &[SignalRecord]) -> Vec<Signal> {
    let mut prior = None;
    records
        .iter()
        .map(|r| {
            let resolved = resolve_hold(r.signal, prior);
            prior = Some(resolved);
            resolved
        })
        .collect()
}

fn digest(records: &[SignalRecord], ledgers: &BTreeMap<LedgerOwner, Vec<LedgerEntry>>) -> RunDigest {
    let mut canonical = String::new();
    for record in records {
        canonical.push_str(&format!(
            "{}|{}|{:?}|{:?}\n",
            record.strategy,
            record.timestamp.to_rfc3339(),
            record.comparison.map(|ts| ts.to_rfc3339()),
            record.signal.map(|s| s.as_str()),
        ));
    }
    for (owner, entries) in ledgers {
        for e in entries {
            canonical.push_str(&format!(
                "{}|{}|{}|{}|{}\n",
                owner,
                e.timestamp.to_rfc3339(),
                e.resolved_signal,
                e.cash_balance,
                e.asset_balance,
            ));
        }
    }
    RunDigest::from_bytes(canonical.as_bytes())
}
