//! Strategy definitions — the closed set of scoring variants.
//!
//! Every strategy shares one contract: given a subject candle and a comparison
//! candle, produce a [`Signal`](crate::domain::Signal). What the comparison
//! candle *is* depends on traversal: the prior candle for forward strategies,
//! the next candle in real time for reverse (hindsight) strategies.

pub mod calculator;
pub mod registry;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::StrategyId;

pub use calculator::{price_delta, score};
pub use registry::StrategyRegistry;

/// Order in which the builder walks a partition's candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Ascending timestamps; comparison is the prior candle.
    Forward,
    /// Descending timestamps; comparison is the next candle in real time.
    Reverse,
}

/// How the threshold strategy measures price movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaMode {
    /// subject.close − comparison.close
    Absolute,
    /// (subject.close − comparison.close) ÷ comparison.close
    Relative,
}

/// Scoring variant plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    /// BUY iff sentiment ratio and price delta both clear their thresholds.
    /// SELL otherwise (ties included). HOLD without a ratio.
    ThresholdDelta {
        delta_mode: DeltaMode,
        price_threshold: Decimal,
        sentiment_threshold: Decimal,
    },
    /// BUY if the next close is higher, SELL if lower, HOLD on a tie.
    Hindsight,
    /// Sign of the forecast's predicted change for the comparison date.
    Forecast,
    /// Forecast, overridden to BUY when the subject's sentiment clears the threshold.
    ForecastWithSentiment { sentiment_threshold: Decimal },
}

impl StrategyKind {
    /// Whether scoring reads the subject's sentiment ratio.
    pub fn uses_sentiment(&self) -> bool {
        matches!(
            self,
            Self::ThresholdDelta { .. } | Self::ForecastWithSentiment { .. }
        )
    }

    /// Whether candles without a sentiment link can never score BUY/SELL.
    pub fn requires_sentiment(&self) -> bool {
        matches!(self, Self::ThresholdDelta { .. })
    }

    pub fn uses_forecast(&self) -> bool {
        matches!(self, Self::Forecast | Self::ForecastWithSentiment { .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ThresholdDelta { .. } => "threshold_delta",
            Self::Hindsight => "hindsight",
            Self::Forecast => "forecast",
            Self::ForecastWithSentiment { .. } => "forecast_with_sentiment",
        }
    }
}

/// Immutable reference data describing one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub id: StrategyId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub traversal: Traversal,
    /// Skip pairs whose time delta exceeds one interval step.
    #[serde(default)]
    pub require_delta: bool,
    pub kind: StrategyKind,
}

impl StrategyDefinition {
    /// Forward strategies that need sentiment only score candles with a
    /// sentiment link, and measure gaps between sentiment dates.
    pub fn sentiment_gated(&self) -> bool {
        self.traversal == Traversal::Forward && self.kind.requires_sentiment()
    }
}
