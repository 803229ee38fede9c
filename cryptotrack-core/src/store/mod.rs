//! Market data store — read-only run inputs plus the outputs runs own.
//!
//! Inputs (candles, sentiment, forecasts) are replaced wholesale by loaders.
//! Outputs (signal records, ledger entries) are replaced wholesale by
//! [`MarketStore::commit_run`] under a single write lock, so readers see
//! either the previous sequence or the new one, never a mixture.
//!
//! Every input replacement drops the outputs derived from it and bumps the
//! generation of each affected partition. A run commits only if the
//! generation it read is still current.

pub mod snapshot;

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::debug;

use crate::data::{link_sentiment, PartitionInputs};
use crate::domain::{
    ForecastSample, Interval, LedgerEntry, LedgerOwner, PartitionKey, PriceCandle,
    SentimentSample, SignalRecord, SimulationKey, StrategyId,
};

pub use snapshot::StoreSnapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate candle timestamp {timestamp} in {partition}")]
    DuplicateTimestamp {
        partition: String,
        timestamp: DateTime<Utc>,
    },

    #[error("candle for {found} loaded into partition {expected}")]
    PartitionMismatch { expected: String, found: String },

    #[error("candle at {timestamp} in {partition} has inconsistent prices")]
    InsaneCandle {
        partition: String,
        timestamp: DateTime<Utc>,
    },

    #[error("inputs of {partition} changed during the run (read generation {read}, now {current})")]
    StaleInputs {
        partition: String,
        read: u64,
        current: u64,
    },

    #[error("snapshot I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot format: {0}")]
    Serde(#[from] serde_json::Error),
}

type ForecastKey = (String, StrategyId);

#[derive(Debug, Default)]
struct StoreState {
    candles: BTreeMap<PartitionKey, Vec<PriceCandle>>,
    sentiment: BTreeMap<Interval, BTreeMap<NaiveDate, SentimentSample>>,
    forecasts: BTreeMap<ForecastKey, BTreeMap<NaiveDate, ForecastSample>>,
    signals: BTreeMap<SimulationKey, Vec<SignalRecord>>,
    ledgers: BTreeMap<SimulationKey, BTreeMap<LedgerOwner, Vec<LedgerEntry>>>,
    generations: BTreeMap<PartitionKey, u64>,
}

impl StoreState {
    fn generation(&self, partition: &PartitionKey) -> u64 {
        self.generations.get(partition).copied().unwrap_or(0)
    }

    /// Drop the outputs of every key matching `stale` and bump the
    /// generation of its partition.
    fn invalidate(&mut self, stale: impl Fn(&SimulationKey) -> bool) -> usize {
        let keys: Vec<SimulationKey> = self.signals.keys().filter(|k| stale(k)).cloned().collect();
        for key in &keys {
            self.signals.remove(key);
            self.ledgers.remove(key);
        }
        keys.len()
    }

    fn bump(&mut self, partition: &PartitionKey) {
        *self.generations.entry(partition.clone()).or_insert(0) += 1;
    }
}

#[derive(Debug, Default)]
pub struct MarketStore {
    state: RwLock<StoreState>,
    run_locks: Mutex<HashMap<SimulationKey, Arc<Mutex<()>>>>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Inputs ──

    /// Replace the candle series of `partition`.
    ///
    /// Outputs derived from the previous series are dropped along with it.
    /// Returns the number of candles linked to a sentiment sample.
    pub fn replace_candles(
        &self,
        partition: &PartitionKey,
        candles: Vec<PriceCandle>,
    ) -> Result<usize, StoreError> {
        let mut candles = candles;
        for c in &candles {
            if &c.partition != partition {
                return Err(StoreError::PartitionMismatch {
                    expected: partition.to_string(),
                    found: c.partition.to_string(),
                });
            }
            if !c.is_sane() {
                return Err(StoreError::InsaneCandle {
                    partition: partition.to_string(),
                    timestamp: c.timestamp,
                });
            }
        }
        candles.sort_by_key(|c| c.timestamp);
        if let Some(pair) = candles.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(StoreError::DuplicateTimestamp {
                partition: partition.to_string(),
                timestamp: pair[1].timestamp,
            });
        }

        let mut state = self.write();
        let linked = match state.sentiment.get(&partition.interval) {
            Some(samples) => link_sentiment(&mut candles, samples),
            None => link_sentiment(&mut candles, &BTreeMap::new()),
        };
        debug!(%partition, candles = candles.len(), linked, "candles replaced");
        state.candles.insert(partition.clone(), candles);
        state.invalidate(|k| &k.partition == partition);
        state.bump(partition);
        Ok(linked)
    }

    /// Upsert sentiment samples for `interval` and relink that interval's candles.
    ///
    /// Samples of other intervals are ignored. Outputs of every partition on
    /// `interval` are dropped. Returns the number of candles linked after the
    /// update.
    pub fn replace_sentiment(&self, interval: Interval, samples: Vec<SentimentSample>) -> usize {
        let mut state = self.write();
        let dropped = state.invalidate(|k| k.partition.interval == interval);
        let affected: Vec<PartitionKey> = state
            .candles
            .keys()
            .filter(|k| k.interval == interval)
            .cloned()
            .collect();
        for partition in &affected {
            state.bump(partition);
        }

        let StoreState {
            candles, sentiment, ..
        } = &mut *state;
        let by_date = sentiment.entry(interval).or_default();
        by_date.extend(
            samples
                .into_iter()
                .filter(|s| s.interval == interval)
                .map(|s| (s.date, s)),
        );
        let by_date: &BTreeMap<NaiveDate, SentimentSample> = by_date;
        let linked: usize = candles
            .iter_mut()
            .filter(|(k, _)| k.interval == interval)
            .map(|(_, series)| link_sentiment(series, by_date))
            .sum();
        debug!(%interval, samples = by_date.len(), linked, dropped, "sentiment replaced");
        linked
    }

    /// Replace the forecasts published for `asset` under `strategy`, dropping
    /// the outputs built from the previous ones.
    pub fn replace_forecasts(&self, asset: &str, strategy: StrategyId, samples: Vec<ForecastSample>) {
        let asset = asset.trim().to_uppercase();
        let by_date: BTreeMap<NaiveDate, ForecastSample> = samples
            .into_iter()
            .filter(|f| f.asset.eq_ignore_ascii_case(&asset) && f.strategy == strategy)
            .map(|f| (f.date, f))
            .collect();
        let mut state = self.write();
        state.invalidate(|k| k.partition.asset == asset && k.strategy == strategy);
        let affected: Vec<PartitionKey> = state
            .candles
            .keys()
            .filter(|k| k.asset == asset)
            .cloned()
            .collect();
        for partition in &affected {
            state.bump(partition);
        }
        state.forecasts.insert((asset, strategy), by_date);
    }

    /// Consistent snapshot of everything a run over `key` reads.
    pub fn inputs_for(&self, key: &SimulationKey) -> PartitionInputs {
        let state = self.read();
        let candles = state
            .candles
            .get(&key.partition)
            .cloned()
            .unwrap_or_default();
        let mut inputs = PartitionInputs::new(key.partition.clone(), candles);
        inputs.generation = state.generation(&key.partition);
        if let Some(samples) = state.sentiment.get(&key.partition.interval) {
            inputs.sentiment = samples.clone();
        }
        if let Some(forecasts) = state
            .forecasts
            .get(&(key.partition.asset.clone(), key.strategy))
        {
            inputs.forecasts = forecasts.clone();
        }
        inputs
    }

    pub fn candles(&self, partition: &PartitionKey) -> Vec<PriceCandle> {
        self.read()
            .candles
            .get(partition)
            .cloned()
            .unwrap_or_default()
    }

    pub fn partitions(&self) -> Vec<PartitionKey> {
        self.read().candles.keys().cloned().collect()
    }

    // ── Outputs ──

    /// Signal records of `key`, ascending by timestamp.
    pub fn signals(&self, key: &SimulationKey) -> Vec<SignalRecord> {
        self.read().signals.get(key).cloned().unwrap_or_default()
    }

    /// Ledger of one owner under `key`, ascending by timestamp.
    pub fn ledger(&self, key: &SimulationKey, owner: &LedgerOwner) -> Vec<LedgerEntry> {
        self.read()
            .ledgers
            .get(key)
            .and_then(|by_owner| by_owner.get(owner))
            .cloned()
            .unwrap_or_default()
    }

    /// Input generation of `partition`; bumped by every input replacement
    /// that touches it.
    pub fn generation(&self, partition: &PartitionKey) -> u64 {
        self.read().generation(partition)
    }

    /// Lock serializing runs over one key. Distinct keys never contend.
    pub fn run_lock(&self, key: &SimulationKey) -> Arc<Mutex<()>> {
        let mut locks = self.run_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Swap in the outputs of one run built from inputs of `generation`.
    /// Every owner's previous ledger for `key` is discarded, including owners
    /// absent from `ledgers`.
    ///
    /// Fails without touching the store if the partition's inputs were
    /// replaced after the run read them.
    pub fn commit_run(
        &self,
        key: &SimulationKey,
        generation: u64,
        records: Vec<SignalRecord>,
        ledgers: BTreeMap<LedgerOwner, Vec<LedgerEntry>>,
    ) -> Result<(), StoreError> {
        let mut state = self.write();
        let current = state.generation(&key.partition);
        if current != generation {
            return Err(StoreError::StaleInputs {
                partition: key.partition.to_string(),
                read: generation,
                current,
            });
        }
        state.signals.insert(key.clone(), records);
        state.ledgers.insert(key.clone(), ledgers);
        Ok(())
    }
}
