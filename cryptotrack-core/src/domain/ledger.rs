//! Ledger entries — the cash/asset split after each signal record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LedgerOwner, Signal, StrategyId};

/// Balances held by one owner at one signal record.
///
/// Balances serialize as decimal strings so long replay chains never pass
/// through binary floating point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub owner: LedgerOwner,
    pub strategy: StrategyId,
    pub timestamp: DateTime<Utc>,
    /// BUY or SELL; HOLD never reaches the ledger.
    pub resolved_signal: Signal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cash_balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub asset_balance: Decimal,
}

impl LedgerEntry {
    /// Mark-to-market value in quote currency at `close`.
    pub fn value_at(&self, close: Decimal) -> Decimal {
        self.cash_balance + self.asset_balance * close
    }

    pub fn is_invested(&self) -> bool {
        self.asset_balance > Decimal::ZERO
    }
}
