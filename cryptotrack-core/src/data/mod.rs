//! Run inputs: the candle, sentiment and forecast view of one partition.

pub mod inputs;

pub use inputs::{link_sentiment, PartitionInputs};
