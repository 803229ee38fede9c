//! Domain types for CryptoTrack

pub mod candle;
pub mod forecast;
pub mod ids;
pub mod ledger;
pub mod partition;
pub mod sentiment;
pub mod signal;

pub use candle::PriceCandle;
pub use forecast::ForecastSample;
pub use ids::{LedgerOwner, RunDigest, StrategyId};
pub use ledger::LedgerEntry;
pub use partition::{Interval, PartitionKey, SimulationKey};
pub use sentiment::{derive_ratio, SentimentSample, RATIO_SCALE};
pub use signal::{Signal, SignalRecord};
