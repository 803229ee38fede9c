//! Ledger replayer — binary all-in/all-out portfolio over signal transitions.
//!
//! Replay is always ascending by timestamp, whatever order the builder walked
//! the candles in. The ledger only moves when the resolved signal differs
//! from the last signal acted on.

use rust_decimal::Decimal;

use crate::data::PartitionInputs;
use crate::domain::{LedgerEntry, LedgerOwner, Signal, SignalRecord, SimulationKey};
use crate::error::SimulationError;

/// Replace HOLD (or a seed's missing signal) with the prior resolved signal.
///
/// With no prior the position is flat, so the result is SELL.
pub fn resolve_hold(signal: Option<Signal>, prior: Option<Signal>) -> Signal {
    match signal {
        Some(Signal::Buy) => Signal::Buy,
        Some(Signal::Sell) => Signal::Sell,
        Some(Signal::Hold) | None => prior.unwrap_or(Signal::Sell),
    }
}

struct Position {
    cash: Decimal,
    asset: Decimal,
    last_acted: Signal,
}

impl Position {
    fn flat() -> Self {
        Self {
            cash: Decimal::ONE,
            asset: Decimal::ZERO,
            last_acted: Signal::Sell,
        }
    }
}

/// Replay `records` for one owner and return one entry per record, ascending.
///
/// The first chronological record anchors the ledger at cash 1 / asset 0 and
/// never trades, whatever its signal.
pub fn replay(
    key: &SimulationKey,
    owner: &LedgerOwner,
    records: &[SignalRecord],
    inputs: &PartitionInputs,
) -> Result<Vec<LedgerEntry>, SimulationError> {
    let mut ordered: Vec<&SignalRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);

    let mut position = Position::flat();
    let mut prior: Option<Signal> = None;
    let mut entries = Vec::with_capacity(ordered.len());

    for (i, record) in ordered.into_iter().enumerate() {
        let inconsistent = |reason: String| SimulationError::Consistency {
            partition: key.partition.to_string(),
            strategy: key.strategy,
            timestamp: record.timestamp,
            reason,
        };

        if record.strategy != key.strategy {
            return Err(inconsistent(format!(
                "record belongs to strategy {}",
                record.strategy
            )));
        }
        let candle = inputs
            .candle_at(record.timestamp)
            .ok_or_else(|| inconsistent("record references a candle not in the partition".into()))?;

        let resolved = resolve_hold(record.signal, prior);
        prior = Some(resolved);

        if i > 0 && resolved != position.last_acted {
            if candle.close <= Decimal::ZERO {
                return Err(inconsistent(format!(
                    "{resolved} transition at non-positive close {}",
                    candle.close
                )));
            }
            match resolved {
                Signal::Buy => {
                    position.asset = position
                        .cash
                        .checked_div(candle.close)
                        .ok_or_else(|| inconsistent("cash to asset conversion overflowed".into()))?;
                    position.cash = Decimal::ZERO;
                }
                _ => {
                    position.cash = position
                        .asset
                        .checked_mul(candle.close)
                        .ok_or_else(|| inconsistent("asset to cash conversion overflowed".into()))?;
                    position.asset = Decimal::ZERO;
                }
            }
            position.last_acted = resolved;
        }

        entries.push(LedgerEntry {
            owner: owner.clone(),
            strategy: key.strategy,
            timestamp: record.timestamp,
            resolved_signal: resolved,
            cash_balance: position.cash,
            asset_balance: position.asset,
        });
    }

    Ok(entries)
}
