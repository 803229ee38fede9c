//! Input loading for the runner.
//!
//! Reads the CSV files named in a [`SimulationConfig`] (or generates
//! synthetic candles) and pushes everything into a [`MarketStore`]:
//! 1. Sentiment first, so candles link as they are loaded
//! 2. Candles per partition (CSV or synthetic random walk)
//! 3. Forecasts per (asset, strategy)
//!
//! Synthetic data is a developer-only mode. Batches that used it are tagged.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use cryptotrack_core::domain::{
    ForecastSample, Interval, PartitionKey, PriceCandle, SentimentSample, StrategyId,
};
use cryptotrack_core::store::{MarketStore, StoreError};
use cryptotrack_core::SimulationError;

use crate::config::{ConfigError, SimulationConfig, SyntheticConfig, MAX_SYNTHETIC_PERIODS};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path}, row {row}: {reason}")]
    Row {
        path: String,
        row: usize,
        reason: String,
    },

    #[error("store rejected input: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Summary of what a load pushed into the store.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub partitions: Vec<PartitionKey>,
    pub candle_count: usize,
    pub linked_count: usize,
    pub sentiment_count: usize,
    pub forecast_count: usize,
    /// BLAKE3 over every candle, sentiment sample and forecast loaded.
    pub dataset_hash: String,
    /// Whether any partition used generated candles.
    pub has_synthetic: bool,
}

// ── CSV rows ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: String,
    #[serde(with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    close: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct SentimentRow {
    date: NaiveDate,
    first_score: Option<u32>,
    second_score: Option<u32>,
    #[serde(default)]
    is_partial: bool,
}

#[derive(Debug, Deserialize)]
struct ForecastRow {
    date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    predicted_value: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    predicted_change: Decimal,
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

// ── Loaders ──────────────────────────────────────────────────────────

pub fn load_candles_csv(path: &Path, partition: &PartitionKey) -> Result<Vec<PriceCandle>, LoadError> {
    read_rows::<CandleRow>(path)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Row {
                path: path.display().to_string(),
                row: i + 1,
                reason: format!("unparseable timestamp '{}'", row.timestamp),
            })?;
            Ok(PriceCandle {
                partition: partition.clone(),
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                sentiment_date: None,
            })
        })
        .collect()
}

/// Ratios are derived from the two raw scores.
pub fn load_sentiment_csv(path: &Path, interval: Interval) -> Result<Vec<SentimentSample>, LoadError> {
    Ok(read_rows::<SentimentRow>(path)?
        .into_iter()
        .map(|row| {
            SentimentSample::from_scores(
                row.date,
                interval,
                row.first_score,
                row.second_score,
                row.is_partial,
            )
        })
        .collect())
}

pub fn load_forecasts_csv(
    path: &Path,
    asset: &str,
    strategy: StrategyId,
) -> Result<Vec<ForecastSample>, LoadError> {
    Ok(read_rows::<ForecastRow>(path)?
        .into_iter()
        .map(|row| ForecastSample {
            asset: asset.trim().to_uppercase(),
            strategy,
            date: row.date,
            predicted_value: row.predicted_value,
            predicted_change: row.predicted_change,
        })
        .collect())
}

/// Load every configured input into `store`.
pub fn load_into_store(config: &SimulationConfig, store: &MarketStore) -> Result<LoadedData, LoadError> {
    let registry = config.registry()?;
    let mut sentiment_count = 0;
    for source in &config.sentiment {
        let interval: Interval = source.interval.parse()?;
        let samples = load_sentiment_csv(&config.resolve_path(&source.path), interval)?;
        sentiment_count += samples.len();
        store.replace_sentiment(interval, samples);
    }

    let mut partitions = Vec::with_capacity(config.partitions.len());
    let mut candle_count = 0;
    let mut linked_count = 0;
    let mut has_synthetic = false;
    for p in &config.partitions {
        let key = p.key()?;
        let candles = match (&p.candles, &p.synthetic) {
            (Some(path), _) => load_candles_csv(&config.resolve_path(path), &key)?,
            (None, Some(synthetic)) => {
                warn!(partition = %key, "generating synthetic candles; results are tagged as synthetic");
                has_synthetic = true;
                generate_synthetic_candles(&key, synthetic)
            }
            (None, None) => Vec::new(),
        };
        candle_count += candles.len();
        linked_count += store.replace_candles(&key, candles)?;
        partitions.push(key);
    }

    let mut forecast_count = 0;
    for source in &config.forecasts {
        let strategy = registry.lookup(&source.strategy)?.id;
        let samples = load_forecasts_csv(&config.resolve_path(&source.path), &source.asset, strategy)?;
        forecast_count += samples.len();
        store.replace_forecasts(&source.asset, strategy, samples);
    }

    let dataset_hash = compute_dataset_hash(store, &partitions);
    info!(
        partitions = partitions.len(),
        candles = candle_count,
        linked = linked_count,
        sentiment = sentiment_count,
        forecasts = forecast_count,
        dataset_hash = %dataset_hash,
        "inputs loaded"
    );
    Ok(LoadedData {
        partitions,
        candle_count,
        linked_count,
        sentiment_count,
        forecast_count,
        dataset_hash,
        has_synthetic,
    })
}

/// Deterministic BLAKE3 hash over the store's inputs for `partitions`.
///
/// Partitions are hashed in sorted order, so the hash does not depend on the
/// order they appear in the config.
pub fn compute_dataset_hash(store: &MarketStore, partitions: &[PartitionKey]) -> String {
    let mut hasher = blake3::Hasher::new();

    let mut sorted: Vec<&PartitionKey> = partitions.iter().collect();
    sorted.sort();
    sorted.dedup();

    let snapshot = store.snapshot();
    for key in sorted {
        hasher.update(key.to_string().as_bytes());
        for c in store.candles(key) {
            hasher.update(c.timestamp.to_rfc3339().as_bytes());
            for v in [c.open, c.high, c.low, c.close, c.volume] {
                hasher.update(v.normalize().to_string().as_bytes());
                hasher.update(b"|");
            }
        }
    }
    for s in &snapshot.sentiment {
        hasher.update(format!("{}|{}|{:?}\n", s.interval, s.date, s.ratio.map(|r| r.normalize())).as_bytes());
    }
    for f in &snapshot.forecasts {
        hasher.update(
            format!(
                "{}|{}|{}|{}|{}\n",
                f.asset,
                f.strategy,
                f.date,
                f.predicted_value.normalize(),
                f.predicted_change.normalize()
            )
            .as_bytes(),
        );
    }

    hasher.finalize().to_hex().to_string()
}

/// Generate a random-walk candle series for development.
///
/// The walk is seeded from the partition key, so the same key always yields
/// the same candles. Moves are at most ±3% per period.
pub fn generate_synthetic_candles(partition: &PartitionKey, config: &SyntheticConfig) -> Vec<PriceCandle> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed_bytes = blake3::hash(partition.to_string().as_bytes());
    let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

    let Some(start) = config.start.and_hms_opt(0, 0, 0).map(|ts| ts.and_utc()) else {
        return Vec::new();
    };
    let step: Duration = partition.interval.step();
    let floor = Decimal::new(1, 2);
    let mut price = config.start_price.round_dp(2).max(floor);

    (0..config.periods.min(MAX_SYNTHETIC_PERIODS))
        .map(|i| {
            let move_bps: i64 = rng.gen_range(-300..=300);
            let open = price;
            let close = (open + open * Decimal::new(move_bps, 4)).round_dp(2).max(floor);
            let wick_up = Decimal::new(rng.gen_range(0..100), 4);
            let wick_down = Decimal::new(rng.gen_range(0..100), 4);
            let high = (open.max(close) * (Decimal::ONE + wick_up))
                .round_dp(2)
                .max(open.max(close));
            let low = (open.min(close) * (Decimal::ONE - wick_down))
                .round_dp(2)
                .max(floor)
                .min(open.min(close));
            let volume = Decimal::from(rng.gen_range(500_000..5_000_000u64));
            price = close;
            PriceCandle {
                partition: partition.clone(),
                timestamp: start + step * i as i32,
                open,
                high,
                low,
                close,
                volume,
                sentiment_date: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key() -> PartitionKey {
        PartitionKey::new("BTC", "USD", "1d", "synthetic").unwrap()
    }

    #[test]
    fn parses_supported_timestamp_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-02"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-02 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-02T01:00:00+01:00"), Some(midnight));
        assert_eq!(parse_timestamp("02/01/2024"), None);
    }

    #[test]
    fn synthetic_candles_are_deterministic_and_sane() {
        let config = SyntheticConfig {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            periods: 200,
            start_price: Decimal::from(100),
        };
        let a = generate_synthetic_candles(&key(), &config);
        let b = generate_synthetic_candles(&key(), &config);
        assert_eq!(a, b);
        assert_eq!(a.len(), 200);
        assert!(a.iter().all(|c| c.is_sane()), "synthetic candles must pass sanity checks");
        assert!(a.windows(2).all(|w| w[1].timestamp - w[0].timestamp == Duration::days(1)));
    }

    #[test]
    fn synthetic_walk_differs_per_partition() {
        let config = SyntheticConfig {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            periods: 20,
            start_price: Decimal::from(100),
        };
        let eth = PartitionKey::new("ETH", "USD", "1d", "synthetic").unwrap();
        let closes = |k: &PartitionKey| -> Vec<Decimal> {
            generate_synthetic_candles(k, &config).iter().map(|c| c.close).collect()
        };
        assert_ne!(closes(&key()), closes(&eth));
    }
}
