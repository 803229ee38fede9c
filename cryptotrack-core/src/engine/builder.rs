//! Signal sequence builder — folds a candle series into signal records.
//!
//! The walk order comes from the strategy's traversal direction; the
//! "previous candle" is an accumulator threaded through the fold, so the
//! comparison for each candle is whatever candle the walk visited last.

use chrono::Duration;
use tracing::{debug, warn};

use crate::data::PartitionInputs;
use crate::domain::{PriceCandle, SignalRecord};
use crate::error::SimulationError;
use crate::strategy::{score, StrategyDefinition, Traversal};

/// Output of one builder pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalSequence {
    /// Sorted by timestamp, ascending, whatever the traversal order was.
    pub records: Vec<SignalRecord>,
    /// Candles skipped because the gap to the previous candle was too wide.
    pub skipped_gaps: usize,
    /// Candles skipped because a value the strategy needs was unusable.
    pub skipped_insufficient: usize,
}

impl SignalSequence {
    pub fn records_written(&self) -> usize {
        self.records.len()
    }
}

struct Fold<'a> {
    previous: Option<&'a PriceCandle>,
    sequence: SignalSequence,
}

/// Walk the partition's candles in `def`'s traversal order and score each
/// candle against the one visited before it.
///
/// The first visited candle yields a seed record. Only non-recoverable errors
/// abort the walk; insufficient data and gaps skip a single candle.
pub fn build_sequence(
    def: &StrategyDefinition,
    inputs: &PartitionInputs,
) -> Result<SignalSequence, SimulationError> {
    let gated = def.sentiment_gated();
    let mut ordered: Vec<&PriceCandle> = inputs
        .candles
        .iter()
        .filter(|c| !gated || c.has_sentiment())
        .collect();
    if def.traversal == Traversal::Reverse {
        ordered.reverse();
    }

    let start = Fold {
        previous: None,
        sequence: SignalSequence::default(),
    };
    let mut fold = ordered
        .into_iter()
        .try_fold(start, |mut acc, candle| {
            match acc.previous {
                None => acc
                    .sequence
                    .records
                    .push(SignalRecord::seed(def.id, candle.timestamp)),
                Some(previous) => {
                    if def.require_delta && !within_gap(gated, candle, previous, inputs) {
                        debug!(
                            partition = %inputs.partition,
                            strategy = def.id.0,
                            candle = %candle.timestamp,
                            previous = %previous.timestamp,
                            "gap too wide, skipping candle"
                        );
                        acc.sequence.skipped_gaps += 1;
                    } else {
                        match score(def, candle, previous, inputs) {
                            Ok(signal) => acc.sequence.records.push(SignalRecord {
                                strategy: def.id,
                                timestamp: candle.timestamp,
                                comparison: Some(previous.timestamp),
                                signal: Some(signal),
                            }),
                            Err(e) if e.is_recoverable() => {
                                warn!(strategy = def.id.0, "skipping candle: {e}");
                                acc.sequence.skipped_insufficient += 1;
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }
            }
            acc.previous = Some(candle);
            Ok(acc)
        })?;

    fold.sequence.records.sort_by_key(|r| r.timestamp);
    Ok(fold.sequence)
}

/// Whether `candle` and `previous` are adjacent enough to be compared.
///
/// Sentiment-gated strategies measure the distance between the linked
/// sentiment dates (day granularity); everything else uses candle timestamps.
fn within_gap(
    gated: bool,
    candle: &PriceCandle,
    previous: &PriceCandle,
    inputs: &PartitionInputs,
) -> bool {
    let step = inputs.partition.interval.step();
    if gated {
        if let (Some(a), Some(b)) = (candle.sentiment_date, previous.sentiment_date) {
            let delta = (a - b).abs();
            return delta <= step.max(Duration::days(1));
        }
    }
    (candle.timestamp - previous.timestamp).abs() <= step
}
