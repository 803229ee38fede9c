//! Performance summary — how a simulated ledger did against buy-and-hold.
//!
//! Pure functions: ledger and candles in, summary out. The ledger starts at
//! one unit of quote currency, so returns are `final value − 1`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cryptotrack_core::domain::{LedgerEntry, LedgerOwner, PriceCandle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub owner: LedgerOwner,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub first_close: Decimal,
    pub last_close: Decimal,
    /// Ledger value at the last close, in quote currency.
    pub final_value: Decimal,
    pub strategy_return: Decimal,
    /// Return of holding the asset from the first ledger entry to the last.
    pub buy_and_hold_return: Decimal,
    pub trade_count: usize,
    pub invested_at_end: bool,
}

impl PerformanceSummary {
    /// `None` when the ledger is empty or its candles are missing.
    pub fn compute(ledger: &[LedgerEntry], candles: &[PriceCandle]) -> Option<Self> {
        let first = ledger.first()?;
        let last = ledger.last()?;
        let first_close = close_at(candles, first.timestamp)?;
        let last_close = close_at(candles, last.timestamp)?;

        let final_value = last.value_at(last_close);
        Some(Self {
            owner: first.owner.clone(),
            start: first.timestamp,
            end: last.timestamp,
            first_close,
            last_close,
            final_value,
            strategy_return: final_value - Decimal::ONE,
            buy_and_hold_return: buy_and_hold_return(first_close, last_close),
            trade_count: trade_count(ledger),
            invested_at_end: last.is_invested(),
        })
    }

    /// Strategy return minus buy-and-hold return.
    pub fn excess_return(&self) -> Decimal {
        self.strategy_return - self.buy_and_hold_return
    }
}

fn close_at(candles: &[PriceCandle], timestamp: DateTime<Utc>) -> Option<Decimal> {
    candles
        .binary_search_by_key(&timestamp, |c| c.timestamp)
        .ok()
        .map(|i| candles[i].close)
}

/// `last / first − 1`; zero when `first` is not positive.
pub fn buy_and_hold_return(first_close: Decimal, last_close: Decimal) -> Decimal {
    if first_close <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    last_close
        .checked_div(first_close)
        .map(|ratio| ratio - Decimal::ONE)
        .unwrap_or(Decimal::ZERO)
}

/// Number of entries where the ledger switched between cash and asset.
pub fn trade_count(ledger: &[LedgerEntry]) -> usize {
    ledger
        .windows(2)
        .filter(|w| w[0].is_invested() != w[1].is_invested())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cryptotrack_core::domain::{PartitionKey, Signal, StrategyId};
    use std::str::FromStr;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn candles(closes: &[i64]) -> Vec<PriceCandle> {
        let key = PartitionKey::new("BTC", "USD", "1d", "test").unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let c = Decimal::from(close);
                PriceCandle {
                    partition: key.clone(),
                    timestamp: ts(i as u32 + 1),
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    volume: Decimal::ONE,
                    sentiment_date: None,
                }
            })
            .collect()
    }

    fn entry(day: u32, signal: Signal, cash: &str, asset: &str) -> LedgerEntry {
        LedgerEntry {
            owner: LedgerOwner::default(),
            strategy: StrategyId(1),
            timestamp: ts(day),
            resolved_signal: signal,
            cash_balance: Decimal::from_str(cash).unwrap(),
            asset_balance: Decimal::from_str(asset).unwrap(),
        }
    }

    #[test]
    fn summary_of_buy_then_sell() {
        let ledger = vec![
            entry(1, Signal::Sell, "1", "0"),
            entry(2, Signal::Buy, "0", "0.005"),
            entry(3, Signal::Sell, "0.75", "0"),
        ];
        let summary = PerformanceSummary::compute(&ledger, &candles(&[100, 200, 150])).unwrap();
        assert_eq!(summary.final_value, Decimal::from_str("0.75").unwrap());
        assert_eq!(summary.strategy_return, Decimal::from_str("-0.25").unwrap());
        assert_eq!(summary.buy_and_hold_return, Decimal::from_str("0.5").unwrap());
        assert_eq!(summary.trade_count, 2);
        assert!(!summary.invested_at_end);
        assert_eq!(summary.excess_return(), Decimal::from_str("-0.75").unwrap());
    }

    #[test]
    fn open_position_is_marked_to_last_close() {
        let ledger = vec![
            entry(1, Signal::Sell, "1", "0"),
            entry(2, Signal::Buy, "0", "0.01"),
            entry(3, Signal::Buy, "0", "0.01"),
        ];
        let summary = PerformanceSummary::compute(&ledger, &candles(&[100, 100, 130])).unwrap();
        assert_eq!(summary.final_value, Decimal::from_str("1.3").unwrap());
        assert_eq!(summary.trade_count, 1);
        assert!(summary.invested_at_end);
    }

    #[test]
    fn empty_ledger_has_no_summary() {
        assert!(PerformanceSummary::compute(&[], &candles(&[100])).is_none());
    }

    #[test]
    fn buy_and_hold_guards_zero_start() {
        assert_eq!(buy_and_hold_return(Decimal::ZERO, Decimal::TEN), Decimal::ZERO);
    }
}
