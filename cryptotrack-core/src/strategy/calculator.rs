//! Signal calculator — scores one (subject, comparison) candle pair.
//!
//! Pure: the result depends only on the two candles, the strategy parameters
//! and the read-only auxiliary data in [`PartitionInputs`].

use rust_decimal::Decimal;
use std::cmp::Ordering;

use super::{DeltaMode, StrategyDefinition, StrategyKind};
use crate::data::PartitionInputs;
use crate::domain::{PriceCandle, Signal};
use crate::error::SimulationError;

/// Score `subject` against `comparison` under `def`.
///
/// Missing sentiment or forecast data yields `HOLD`, not an error.
/// `InsufficientData` is returned only when a value the arithmetic needs is
/// unusable, and the caller is expected to skip the pair.
pub fn score(
    def: &StrategyDefinition,
    subject: &PriceCandle,
    comparison: &PriceCandle,
    inputs: &PartitionInputs,
) -> Result<Signal, SimulationError> {
    match &def.kind {
        StrategyKind::ThresholdDelta {
            delta_mode,
            price_threshold,
            sentiment_threshold,
        } => {
            let Some(ratio) = inputs.sentiment_ratio(subject) else {
                return Ok(Signal::Hold);
            };
            let delta = price_delta(*delta_mode, subject, comparison)?;
            if ratio > *sentiment_threshold && delta > *price_threshold {
                Ok(Signal::Buy)
            } else {
                Ok(Signal::Sell)
            }
        }
        StrategyKind::Hindsight => Ok(match subject.close.cmp(&comparison.close) {
            Ordering::Less => Signal::Buy,
            Ordering::Greater => Signal::Sell,
            Ordering::Equal => Signal::Hold,
        }),
        StrategyKind::Forecast => Ok(forecast_signal(comparison, inputs)),
        StrategyKind::ForecastWithSentiment {
            sentiment_threshold,
        } => {
            let forecast = forecast_signal(comparison, inputs);
            match inputs.sentiment_ratio(subject) {
                Some(ratio) if ratio > *sentiment_threshold => Ok(Signal::Buy),
                _ => Ok(forecast),
            }
        }
    }
}

/// Close-to-close move of `subject` relative to `comparison`.
pub fn price_delta(
    mode: DeltaMode,
    subject: &PriceCandle,
    comparison: &PriceCandle,
) -> Result<Decimal, SimulationError> {
    let delta = subject.close - comparison.close;
    match mode {
        DeltaMode::Absolute => Ok(delta),
        DeltaMode::Relative => {
            if comparison.close.is_zero() {
                return Err(SimulationError::InsufficientData {
                    partition: subject.partition.to_string(),
                    timestamp: subject.timestamp,
                    reason: format!(
                        "comparison candle {} has a zero close",
                        comparison.timestamp
                    ),
                });
            }
            delta
                .checked_div(comparison.close)
                .ok_or_else(|| SimulationError::InsufficientData {
                    partition: subject.partition.to_string(),
                    timestamp: subject.timestamp,
                    reason: "relative delta overflowed".into(),
                })
        }
    }
}

fn forecast_signal(comparison: &PriceCandle, inputs: &PartitionInputs) -> Signal {
    match inputs.forecast_on(comparison.date()) {
        Some(f) if f.predicted_change > Decimal::ZERO => Signal::Buy,
        Some(f) if f.predicted_change < Decimal::ZERO => Signal::Sell,
        _ => Signal::Hold,
    }
}
