//! PriceCandle — the fundamental market data unit.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PartitionKey;

/// OHLCV observation for one period of one partition.
///
/// Candles are read-only to the engine. A reload replaces a partition's
/// candles wholesale; the only field the store rewrites in place is the
/// sentiment link, which is derived from the candle's calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCandle {
    pub partition: PartitionKey,
    /// Period start (UTC). Unique within a partition.
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Date of the linked sentiment sample, if one exists for this candle's day.
    #[serde(default)]
    pub sentiment_date: Option<NaiveDate>,
}

impl PriceCandle {
    /// Calendar date of the period start.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn has_sentiment(&self) -> bool {
        self.sentiment_date.is_some()
    }

    /// Basic OHLC sanity: high bounds everything, low is bounded by everything,
    /// prices are positive.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > Decimal::ZERO
            && self.close > Decimal::ZERO
            && self.volume >= Decimal::ZERO
    }
}
