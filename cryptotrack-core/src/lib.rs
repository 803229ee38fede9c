//! CryptoTrack Core — signal building and ledger simulation over market data.
//!
//! This crate contains the simulation engine:
//! - Domain types (candles, sentiment, forecasts, signals, ledger entries)
//! - Strategy definitions, the built-in registry and the pure signal calculator
//! - Signal sequence builder (forward and reverse traversal)
//! - Ledger replayer with HOLD resolution
//! - In-memory market store with atomic commits and JSON snapshots

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod store;
pub mod strategy;

pub use error::SimulationError;
