//! Structured error types for the simulation engine.
//!
//! Three failure classes matter to callers:
//! - `Configuration`: the request itself is bad. Raised before any stored
//!   state is touched, so retrying after fixing the request is always safe.
//! - `InsufficientData`: one candle lacks a value its strategy needs. The
//!   builder recovers locally by skipping the candle.
//! - `Consistency`: the ledger replay hit input it cannot interpret. Fatal for
//!   the partition being rebuilt, never for its neighbours.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::domain::StrategyId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("insufficient data for {partition} at {timestamp}: {reason}")]
    InsufficientData {
        partition: String,
        timestamp: DateTime<Utc>,
        reason: String,
    },

    #[error("consistency error in {partition} (strategy {strategy}) at {timestamp}: {reason}")]
    Consistency {
        partition: String,
        strategy: StrategyId,
        timestamp: DateTime<Utc>,
        reason: String,
    },

    #[error("inputs of {partition} were replaced while strategy {strategy} was building; rebuild it")]
    StaleInputs {
        partition: String,
        strategy: StrategyId,
    },

    #[error("no signal for {partition} under strategy {strategy}{}", date_suffix(.date))]
    NotFound {
        partition: String,
        strategy: StrategyId,
        date: Option<NaiveDate>,
    },
}

fn date_suffix(date: &Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!(" on {d}"),
        None => String::new(),
    }
}

impl SimulationError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// True for errors the builder absorbs by skipping a single candle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_insufficient_data_is_recoverable() {
        let ts = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let insufficient = SimulationError::InsufficientData {
            partition: "BTC/USD@1d[test]".into(),
            timestamp: ts,
            reason: "zero close".into(),
        };
        assert!(insufficient.is_recoverable());
        assert!(!SimulationError::configuration("unknown strategy").is_recoverable());
    }

    #[test]
    fn not_found_message_includes_date_when_given() {
        let err = SimulationError::NotFound {
            partition: "BTC/USD@1d[test]".into(),
            strategy: StrategyId(1),
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
        };
        assert!(err.to_string().ends_with("on 2024-03-01"));

        let latest = SimulationError::NotFound {
            partition: "BTC/USD@1d[test]".into(),
            strategy: StrategyId(1),
            date: None,
        };
        assert!(latest.to_string().ends_with("strategy 1"));
    }
}
