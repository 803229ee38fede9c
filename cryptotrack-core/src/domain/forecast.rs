//! Forecast samples supplied by the external forecasting subsystem.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::StrategyId;

/// Predicted value and signed predicted change for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub asset: String,
    pub strategy: StrategyId,
    pub date: NaiveDate,
    pub predicted_value: Decimal,
    pub predicted_change: Decimal,
}
