//! Integration tests for the runner: TOML config + CSV inputs on disk,
//! full batch through every built-in strategy.

use std::path::Path;
use std::sync::Arc;

use cryptotrack_core::domain::{LedgerOwner, PartitionKey, SimulationKey, StrategyId};
use cryptotrack_core::store::MarketStore;
use cryptotrack_runner::config::SimulationConfig;
use cryptotrack_runner::report::{write_batch_artifacts, write_ledger_csv};
use cryptotrack_runner::runner::run_from_config;

// ── Fixtures ─────────────────────────────────────────────────────────

const CANDLES: &str = "\
timestamp,open,high,low,close,volume
2024-01-01,100,105,95,100,10
2024-01-02,100,125,100,120,12
2024-01-03,120,121,85,90,9
2024-01-04,90,140,90,130,15
2024-01-05,130,131,100,110,11
";

const SENTIMENT: &str = "\
date,first_score,second_score,is_partial
2024-01-01,40,100,false
2024-01-02,80,100,false
2024-01-03,,100,false
2024-01-04,90,100,false
2024-01-05,20,100,true
";

const FORECASTS: &str = "\
date,predicted_value,predicted_change
2024-01-01,101,1
2024-01-02,118,-2
2024-01-03,95,5
2024-01-04,128,-2
2024-01-05,115,5
";

fn write_fixtures(dir: &Path, extra: &str) -> SimulationConfig {
    std::fs::write(dir.join("btc.csv"), CANDLES).unwrap();
    std::fs::write(dir.join("trend.csv"), SENTIMENT).unwrap();
    std::fs::write(dir.join("forecast.csv"), FORECASTS).unwrap();
    let toml = format!(
        r#"
owners = ["admin", "alice"]
parallel = true
{extra}

[[partitions]]
asset = "BTC"
quote = "USD"
interval = "1d"
source = "fixture"
candles = "btc.csv"

[[sentiment]]
interval = "1d"
path = "trend.csv"

[[forecasts]]
asset = "BTC"
strategy = "forecast"
path = "forecast.csv"
"#
    );
    let path = dir.join("batch.toml");
    std::fs::write(&path, toml).unwrap();
    SimulationConfig::load(&path).unwrap()
}

fn btc() -> PartitionKey {
    PartitionKey::new("BTC", "USD", "1d", "fixture").unwrap()
}

// ── Batch Runs ───────────────────────────────────────────────────────

#[test]
fn full_batch_builds_every_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path(), "");
    let store = Arc::new(MarketStore::new());

    let report = run_from_config(&config, Arc::clone(&store)).unwrap();
    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.failed(), 0);
    assert!(!report.has_synthetic);

    for outcome in &report.outcomes {
        let build = outcome.report.as_ref().unwrap();
        assert!(build.records_written <= 5);
        // One ledger per owner, one entry per record.
        assert_eq!(build.ledger_entries, build.records_written * 2);
    }

    let hindsight = SimulationKey::new(btc(), StrategyId(3));
    assert_eq!(store.signals(&hindsight).len(), 5);
    // Owners differ only in the owner column.
    let tape = |owner: &str| {
        let entries = store.ledger(&hindsight, &LedgerOwner::new(owner));
        assert!(entries.iter().all(|e| e.owner.to_string() == owner));
        entries
            .into_iter()
            .map(|e| (e.timestamp, e.resolved_signal, e.cash_balance, e.asset_balance))
            .collect::<Vec<_>>()
    };
    let admin = tape("admin");
    assert_eq!(admin.len(), 5);
    assert_eq!(admin, tape("alice"));
}

#[test]
fn hindsight_never_loses_money() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path(), "strategies = [\"hindsight\"]");
    let report = run_from_config(&config, Arc::new(MarketStore::new())).unwrap();

    assert_eq!(report.outcomes.len(), 1);
    let perf = &report.outcomes[0].performance;
    assert_eq!(perf.len(), 2);
    for summary in perf {
        assert!(summary.final_value >= rust_decimal::Decimal::ONE);
        assert!(summary.strategy_return >= rust_decimal::Decimal::ZERO);
    }
}

#[test]
fn rerun_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path(), "");

    let first = run_from_config(&config, Arc::new(MarketStore::new())).unwrap();
    let second = run_from_config(&config, Arc::new(MarketStore::new())).unwrap();

    assert_eq!(first.run_id, second.run_id);
    assert_eq!(first.dataset_hash, second.dataset_hash);
    for (a, b) in first.outcomes.iter().zip(&second.outcomes) {
        assert_eq!(a.report, b.report);
        assert_eq!(a.performance, b.performance);
    }
}

#[test]
fn sequential_batch_matches_parallel() {
    let dir = tempfile::tempdir().unwrap();
    let parallel = write_fixtures(dir.path(), "");
    let mut sequential = parallel.clone();
    sequential.parallel = false;

    let a = run_from_config(&parallel, Arc::new(MarketStore::new())).unwrap();
    let b = run_from_config(&sequential, Arc::new(MarketStore::new())).unwrap();
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.dataset_hash, b.dataset_hash);
    for (x, y) in a.outcomes.iter().zip(&b.outcomes) {
        assert_eq!(x.report, y.report);
    }
}

#[test]
fn synthetic_partition_is_tagged() {
    let toml = r#"
        strategies = ["hindsight"]

        [[partitions]]
        asset = "SYN"
        quote = "USD"
        interval = "1d"
        source = "synthetic"

        [partitions.synthetic]
        start = "2024-01-01"
        periods = 60
    "#;
    let config = SimulationConfig::from_toml_str(toml).unwrap();
    let report = run_from_config(&config, Arc::new(MarketStore::new())).unwrap();

    assert!(report.has_synthetic);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.outcomes[0].report.as_ref().unwrap().records_written, 60);
}

#[test]
fn missing_candle_file_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path(), "");
    std::fs::remove_file(dir.path().join("btc.csv")).unwrap();

    let err = run_from_config(&config, Arc::new(MarketStore::new())).unwrap_err();
    assert!(err.to_string().starts_with("data error"));
}

// ── Artifacts ────────────────────────────────────────────────────────

#[test]
fn artifacts_are_written_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path(), "");
    let store = Arc::new(MarketStore::new());
    let report = run_from_config(&config, Arc::clone(&store)).unwrap();

    let out = dir.path().join("out");
    let paths = write_batch_artifacts(&out, &report).unwrap();
    assert!(paths.report_json.starts_with(out.join(&report.run_id)));

    let summary = std::fs::read_to_string(&paths.summary_csv).unwrap();
    // Header plus one row per (strategy, owner).
    assert_eq!(summary.lines().count(), 1 + 5 * 2);

    let json = std::fs::read_to_string(&paths.report_json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["outcomes"].as_array().unwrap().len(), 5);

    let ledger_path = dir.path().join("ledger.csv");
    let key = SimulationKey::new(btc(), StrategyId(3));
    write_ledger_csv(&ledger_path, &store.ledger(&key, &LedgerOwner::default())).unwrap();
    let ledger = std::fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(ledger.lines().count(), 6);
}
