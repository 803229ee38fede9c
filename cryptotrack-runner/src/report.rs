//! Batch artifact export (JSON report, summary CSV, ledger CSV).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use cryptotrack_core::domain::LedgerEntry;

use crate::runner::BatchReport;

/// Paths written by [`write_batch_artifacts`].
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub report_json: PathBuf,
    pub summary_csv: PathBuf,
}

/// Write `batch.json` and `summary.csv` under `output_dir/<run_id>/`.
pub fn write_batch_artifacts(output_dir: &Path, report: &BatchReport) -> Result<ArtifactPaths> {
    let run_dir = output_dir.join(&report.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create artifact directory {}", run_dir.display()))?;

    let report_json = run_dir.join("batch.json");
    let json = serde_json::to_string_pretty(report).context("Failed to serialize batch report")?;
    std::fs::write(&report_json, json)
        .with_context(|| format!("Failed to write {}", report_json.display()))?;

    let summary_csv = run_dir.join("summary.csv");
    write_summary_csv(&summary_csv, report)?;

    Ok(ArtifactPaths {
        report_json,
        summary_csv,
    })
}

/// One row per (job, owner); failed jobs get one row with the error.
pub fn write_summary_csv(path: &Path, report: &BatchReport) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create summary CSV {}", path.display()))?;

    writer.write_record([
        "partition",
        "strategy",
        "owner",
        "records",
        "final_value",
        "strategy_return",
        "buy_and_hold_return",
        "trades",
        "error",
    ])?;

    for outcome in &report.outcomes {
        let partition = outcome.key.partition.to_string();
        let records = outcome
            .report
            .as_ref()
            .map(|r| r.records_written.to_string())
            .unwrap_or_default();
        if outcome.performance.is_empty() {
            writer.write_record([
                partition.as_str(),
                outcome.strategy_name.as_str(),
                "",
                records.as_str(),
                "",
                "",
                "",
                "",
                outcome.error.as_deref().unwrap_or(""),
            ])?;
            continue;
        }
        for perf in &outcome.performance {
            writer.write_record([
                partition.clone(),
                outcome.strategy_name.clone(),
                perf.owner.to_string(),
                records.clone(),
                perf.final_value.round_dp(8).to_string(),
                perf.strategy_return.round_dp(8).to_string(),
                perf.buy_and_hold_return.round_dp(8).to_string(),
                perf.trade_count.to_string(),
                String::new(),
            ])?;
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write summary CSV {}", path.display()))?;
    Ok(())
}

/// Ledger tape for one owner, in timestamp order.
pub fn write_ledger_csv(path: &Path, entries: &[LedgerEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create ledger CSV {}", path.display()))?;

    writer.write_record([
        "timestamp",
        "owner",
        "strategy",
        "resolved_signal",
        "cash_balance",
        "asset_balance",
    ])?;
    for e in entries {
        writer.write_record([
            e.timestamp.to_rfc3339(),
            e.owner.to_string(),
            e.strategy.to_string(),
            e.resolved_signal.to_string(),
            e.cash_balance.to_string(),
            e.asset_balance.to_string(),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write ledger CSV {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use cryptotrack_core::domain::{LedgerOwner, PartitionKey, Signal, SimulationKey, StrategyId};
    use rust_decimal::Decimal;

    use crate::runner::JobOutcome;

    fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn ledger_owner_with_comma_stays_one_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let entries = vec![LedgerEntry {
            owner: LedgerOwner::new("Smith, J"),
            strategy: StrategyId(3),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            resolved_signal: Signal::Buy,
            cash_balance: Decimal::ZERO,
            asset_balance: Decimal::new(1, 2),
        }];
        write_ledger_csv(&path, &entries).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 6);
        assert_eq!(&rows[0][1], "Smith, J");
        assert_eq!(&rows[0][3], "BUY");
        assert_eq!(&rows[0][5], "0.01");
    }

    #[test]
    fn summary_error_keeps_its_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let key = SimulationKey::new(
            PartitionKey::new("BTC", "USD", "1d", "test").unwrap(),
            StrategyId(1),
        );
        let report = BatchReport {
            run_id: "run".into(),
            dataset_hash: "hash".into(),
            has_synthetic: false,
            outcomes: vec![JobOutcome {
                key,
                strategy_name: "delta, absolute".into(),
                report: None,
                error: Some("missing sentiment, rebuild after load".into()),
                performance: Vec::new(),
            }],
        };
        write_summary_csv(&path, &report).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 9);
        assert_eq!(&rows[0][1], "delta, absolute");
        assert_eq!(&rows[0][8], "missing sentiment, rebuild after load");
    }
}
