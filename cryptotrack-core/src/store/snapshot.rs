//! JSON snapshot of a [`MarketStore`].
//!
//! JSON object keys must be strings, so keyed collections are flattened into
//! lists that carry their own keys. Loading goes back through the normal
//! replace paths, so a snapshot is validated exactly like fresh input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{MarketStore, StoreError};
use crate::domain::{
    ForecastSample, LedgerEntry, LedgerOwner, PartitionKey, PriceCandle, SentimentSample,
    SignalRecord, SimulationKey,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSet {
    pub partition: PartitionKey,
    pub candles: Vec<PriceCandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSet {
    pub key: SimulationKey,
    pub records: Vec<SignalRecord>,
    pub ledgers: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub candles: Vec<CandleSet>,
    pub sentiment: Vec<SentimentSample>,
    pub forecasts: Vec<ForecastSample>,
    pub outputs: Vec<OutputSet>,
}

impl MarketStore {
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read();
        StoreSnapshot {
            candles: state
                .candles
                .iter()
                .map(|(partition, candles)| CandleSet {
                    partition: partition.clone(),
                    candles: candles.clone(),
                })
                .collect(),
            sentiment: state
                .sentiment
                .values()
                .flat_map(|by_date| by_date.values().cloned())
                .collect(),
            forecasts: state
                .forecasts
                .values()
                .flat_map(|by_date| by_date.values().cloned())
                .collect(),
            outputs: state
                .signals
                .iter()
                .map(|(key, records)| OutputSet {
                    key: key.clone(),
                    records: records.clone(),
                    ledgers: state
                        .ledgers
                        .get(key)
                        .map(|by_owner| by_owner.values().flatten().cloned().collect())
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let store = Self::new();
        let mut by_interval: BTreeMap<_, Vec<SentimentSample>> = BTreeMap::new();
        for sample in snapshot.sentiment {
            by_interval.entry(sample.interval).or_default().push(sample);
        }
        for (interval, samples) in by_interval {
            store.replace_sentiment(interval, samples);
        }

        for set in snapshot.candles {
            store.replace_candles(&set.partition, set.candles)?;
        }

        let mut forecasts: BTreeMap<_, Vec<ForecastSample>> = BTreeMap::new();
        for f in snapshot.forecasts {
            forecasts
                .entry((f.asset.clone(), f.strategy))
                .or_default()
                .push(f);
        }
        for ((asset, strategy), samples) in forecasts {
            store.replace_forecasts(&asset, strategy, samples);
        }

        for set in snapshot.outputs {
            let mut ledgers: BTreeMap<LedgerOwner, Vec<LedgerEntry>> = BTreeMap::new();
            for entry in set.ledgers {
                ledgers.entry(entry.owner.clone()).or_default().push(entry);
            }
            let generation = store.generation(&set.key.partition);
            store.commit_run(&set.key, generation, set.records, ledgers)?;
        }
        Ok(store)
    }

    /// Write the store to `path`. Writes to a `.tmp` sibling and renames it
    /// into place.
    pub fn save_json(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            e
        })?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)?;
        Self::from_snapshot(serde_json::from_str(&content)?)
    }

    /// Load `path` if it exists, otherwise start empty.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            Self::load_json(path)
        } else {
            Ok(Self::new())
        }
    }
}
