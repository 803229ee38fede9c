//! CryptoTrack Runner — batch orchestration, input loading, performance summaries.
//!
//! This crate builds on `cryptotrack-core` to provide:
//! - TOML batch configuration with content-addressed run ids
//! - CSV loading for candles, search sentiment and forecasts
//! - Synthetic random-walk candles for development
//! - Parallel (partition, strategy) batch builds
//! - Strategy vs buy-and-hold performance summaries
//! - Batch artifacts (JSON report, summary and ledger CSVs)

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod report;
pub mod runner;

pub use config::{
    ConfigError, PartitionConfig, RunId, SimulationConfig, SyntheticConfig, MAX_SYNTHETIC_PERIODS,
};
pub use data_loader::{generate_synthetic_candles, load_into_store, LoadError, LoadedData};
pub use metrics::PerformanceSummary;
pub use report::{write_batch_artifacts, write_ledger_csv, ArtifactPaths};
pub use runner::{plan_jobs, run_batch, run_from_config, BatchReport, JobOutcome, RunError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<SimulationConfig>();
        assert_sync::<SimulationConfig>();
    }

    #[test]
    fn batch_report_is_send_sync() {
        assert_send::<BatchReport>();
        assert_sync::<BatchReport>();
        assert_send::<JobOutcome>();
        assert_sync::<JobOutcome>();
    }

    #[test]
    fn performance_summary_is_send_sync() {
        assert_send::<PerformanceSummary>();
        assert_sync::<PerformanceSummary>();
    }
}
