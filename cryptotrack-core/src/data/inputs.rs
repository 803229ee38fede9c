//! Read-only inputs for one simulation run.
//!
//! A `PartitionInputs` is a snapshot: the candle series of one partition
//! (ascending, sentiment links resolved), the sentiment samples of its
//! interval, and the forecasts published for its asset under one strategy.
//! The builder and the replayer only ever read from it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::domain::{ForecastSample, PartitionKey, PriceCandle, SentimentSample};

#[derive(Debug, Clone)]
pub struct PartitionInputs {
    pub partition: PartitionKey,
    /// Sorted by timestamp, ascending.
    pub candles: Vec<PriceCandle>,
    pub sentiment: BTreeMap<NaiveDate, SentimentSample>,
    pub forecasts: BTreeMap<NaiveDate, ForecastSample>,
    /// Store generation the snapshot was taken at; zero outside a store.
    pub generation: u64,
}

impl PartitionInputs {
    /// Candles of other partitions are dropped; the rest are sorted.
    pub fn new(partition: PartitionKey, candles: Vec<PriceCandle>) -> Self {
        let mut candles: Vec<PriceCandle> = candles
            .into_iter()
            .filter(|c| c.partition == partition)
            .collect();
        candles.sort_by_key(|c| c.timestamp);
        Self {
            partition,
            candles,
            sentiment: BTreeMap::new(),
            forecasts: BTreeMap::new(),
            generation: 0,
        }
    }

    /// Attach sentiment samples for this partition's interval and relink candles.
    pub fn with_sentiment(mut self, samples: impl IntoIterator<Item = SentimentSample>) -> Self {
        let interval = self.partition.interval;
        self.sentiment.extend(
            samples
                .into_iter()
                .filter(|s| s.interval == interval)
                .map(|s| (s.date, s)),
        );
        link_sentiment(&mut self.candles, &self.sentiment);
        self
    }

    pub fn with_forecasts(mut self, samples: impl IntoIterator<Item = ForecastSample>) -> Self {
        self.forecasts
            .extend(samples.into_iter().map(|f| (f.date, f)));
        self
    }

    /// Ratio of the sample linked to `candle`, if both exist.
    pub fn sentiment_ratio(&self, candle: &PriceCandle) -> Option<Decimal> {
        candle
            .sentiment_date
            .and_then(|d| self.sentiment.get(&d))
            .and_then(|s| s.ratio)
    }

    pub fn forecast_on(&self, date: NaiveDate) -> Option<&ForecastSample> {
        self.forecasts.get(&date)
    }

    pub fn candle_at(&self, timestamp: DateTime<Utc>) -> Option<&PriceCandle> {
        self.candles
            .binary_search_by_key(&timestamp, |c| c.timestamp)
            .ok()
            .map(|i| &self.candles[i])
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Point each candle at the sample for its calendar date (or clear the link).
///
/// Returns the number of candles that ended up linked.
pub fn link_sentiment(
    candles: &mut [PriceCandle],
    sentiment: &BTreeMap<NaiveDate, SentimentSample>,
) -> usize {
    let mut linked = 0;
    for candle in candles.iter_mut() {
        let date = candle.date();
        candle.sentiment_date = sentiment.contains_key(&date).then_some(date);
        if candle.sentiment_date.is_some() {
            linked += 1;
        }
    }
    linked
}
