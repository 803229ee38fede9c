//! Signals and the per-candle records that carry them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::StrategyId;

/// Categorical trading decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            "HOLD" => Ok(Self::Hold),
            other => Err(format!("unknown signal '{other}'")),
        }
    }
}

/// The signal computed for one candle under one strategy.
///
/// Candles are referenced by timestamp, which is unique within a partition;
/// the (timestamp, strategy) pair is the record's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub strategy: StrategyId,
    pub timestamp: DateTime<Utc>,
    /// Candle the signal was derived against. `None` for the seed record.
    pub comparison: Option<DateTime<Utc>>,
    /// `None` for the seed record.
    pub signal: Option<Signal>,
}

impl SignalRecord {
    /// First record of a traversal: anchors the ledger, carries no decision.
    pub fn seed(strategy: StrategyId, timestamp: DateTime<Utc>) -> Self {
        Self {
            strategy,
            timestamp,
            comparison: None,
            signal: None,
        }
    }

    pub fn is_seed(&self) -> bool {
        self.comparison.is_none()
    }
}
