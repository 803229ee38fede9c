//! Search-interest sentiment samples.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Interval;

/// Decimal places kept on a derived ratio.
pub const RATIO_SCALE: u32 = 5;

/// Two raw interest scores for one calendar date, plus their ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSample {
    pub date: NaiveDate,
    pub interval: Interval,
    pub first_score: Option<u32>,
    pub second_score: Option<u32>,
    /// Provider flagged the period as still in progress.
    #[serde(default)]
    pub is_partial: bool,
    /// first ÷ second. `None` when either score is missing or the second is zero.
    pub ratio: Option<Decimal>,
}

impl SentimentSample {
    /// Build a sample from raw scores, deriving the ratio.
    pub fn from_scores(
        date: NaiveDate,
        interval: Interval,
        first_score: Option<u32>,
        second_score: Option<u32>,
        is_partial: bool,
    ) -> Self {
        Self {
            date,
            interval,
            first_score,
            second_score,
            is_partial,
            ratio: derive_ratio(first_score, second_score),
        }
    }

    /// Build a sample that carries a precomputed ratio and no raw scores.
    ///
    /// Negative ratios are rejected (returned as `None` ratio).
    pub fn with_ratio(date: NaiveDate, interval: Interval, ratio: Decimal) -> Self {
        Self {
            date,
            interval,
            first_score: None,
            second_score: None,
            is_partial: false,
            ratio: (ratio >= Decimal::ZERO).then_some(ratio),
        }
    }
}

/// first ÷ second, rounded to [`RATIO_SCALE`] places.
pub fn derive_ratio(first: Option<u32>, second: Option<u32>) -> Option<Decimal> {
    let (first, second) = (first?, second?);
    if second == 0 {
        return None;
    }
    let ratio = Decimal::from(first) / Decimal::from(second);
    Some(ratio.round_dp(RATIO_SCALE))
}
