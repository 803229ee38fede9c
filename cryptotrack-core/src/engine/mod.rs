//! Simulation engine — signal building, ledger replay and the run lifecycle.
//!
//! A run over one (partition, strategy) key:
//!
//! 1. Build: fold the ordered candles into signal records (`builder`)
//! 2. Replay: walk the records ascending and derive each owner's ledger (`ledger`)
//! 3. Commit: swap the outputs into the store atomically (`simulation`)

pub mod builder;
pub mod ledger;
pub mod simulation;

pub use builder::{build_sequence, SignalSequence};
pub use ledger::{replay, resolve_hold};
pub use simulation::{BuildReport, SignalView, SimulationEngine};
