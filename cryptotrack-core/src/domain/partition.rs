//! Partition keys — which candles a run reads and which outputs it owns.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::StrategyId;
use crate::error::SimulationError;

/// Candle period length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1h")]
    Hour,
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "1w")]
    Week,
}

impl Interval {
    /// Distance between the starts of two adjacent candles.
    pub fn step(&self) -> Duration {
        match self {
            Self::Hour => Duration::hours(1),
            Self::Day => Duration::days(1),
            Self::Week => Duration::weeks(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "1h",
            Self::Day => "1d",
            Self::Week => "1w",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(Self::Hour),
            "1d" => Ok(Self::Day),
            "1w" => Ok(Self::Week),
            other => Err(SimulationError::configuration(format!(
                "unsupported period interval '{other}' (expected 1h, 1d or 1w)"
            ))),
        }
    }
}

/// (asset, quote, interval, source): one independently ordered candle series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub asset: String,
    pub quote: String,
    pub interval: Interval,
    pub source: String,
}

impl PartitionKey {
    /// Build a validated key. Asset and quote symbols are upper-cased.
    pub fn new(
        asset: &str,
        quote: &str,
        interval: &str,
        source: &str,
    ) -> Result<Self, SimulationError> {
        let asset = asset.trim().to_uppercase();
        let quote = quote.trim().to_uppercase();
        let source = source.trim().to_string();
        if asset.is_empty() || quote.is_empty() || source.is_empty() {
            return Err(SimulationError::configuration(format!(
                "malformed partition key: asset='{asset}' quote='{quote}' source='{source}'"
            )));
        }
        Ok(Self {
            asset,
            quote,
            interval: interval.parse()?,
            source,
        })
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}[{}]",
            self.asset, self.quote, self.interval, self.source
        )
    }
}

/// A partition under one strategy: the unit of signal and ledger ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimulationKey {
    pub partition: PartitionKey,
    pub strategy: StrategyId,
}

impl SimulationKey {
    pub fn new(partition: PartitionKey, strategy: StrategyId) -> Self {
        Self {
            partition,
            strategy,
        }
    }
}

impl fmt::Display for SimulationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.partition, self.strategy)
    }
}
