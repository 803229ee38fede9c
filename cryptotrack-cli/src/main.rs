//! CryptoTrack CLI — batch runs, rebuilds and signal/ledger queries.
//!
//! Commands:
//! - `run` — load a TOML batch config, build every job, save the store and artifacts
//! - `build` — rebuild one partition (one strategy or all) from the saved store
//! - `signal` — print the signal for a date, or the latest actionable one
//! - `ledger` — print (or export) an owner's ledger
//! - `strategies` — list the registered strategies
//!
//! State persists between commands in a JSON store snapshot.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cryptotrack_core::domain::{LedgerOwner, PartitionKey, StrategyId};
use cryptotrack_core::engine::{BuildReport, SignalView, SimulationEngine};
use cryptotrack_core::store::MarketStore;
use cryptotrack_core::strategy::{StrategyKind, StrategyRegistry};
use cryptotrack_runner::{
    run_from_config, write_batch_artifacts, write_ledger_csv, BatchReport, SimulationConfig,
};

#[derive(Parser)]
#[command(
    name = "cryptotrack",
    about = "CryptoTrack CLI — sentiment signal and ledger simulation"
)]
struct Cli {
    /// Store snapshot shared by all commands.
    #[arg(long, global = true, default_value = "data/store.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load inputs from a TOML config and build every configured job.
    Run {
        /// Path to a TOML batch config.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for batch artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Rebuild signals and ledgers of one partition from the saved store.
    Build {
        /// Partition as ASSET/QUOTE/INTERVAL/SOURCE (e.g. BTC/USD/1d/nomics).
        #[arg(long)]
        partition: String,

        /// Strategy id or name. Omit to rebuild every strategy.
        #[arg(long)]
        strategy: Option<String>,

        /// Config whose strategy overrides and owners apply.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the signal for a date (YYYY-MM-DD), or the latest BUY/SELL/HOLD.
    Signal {
        #[arg(long)]
        partition: String,

        #[arg(long)]
        strategy: String,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print an owner's ledger, or write it as CSV.
    Ledger {
        #[arg(long)]
        partition: String,

        #[arg(long)]
        strategy: String,

        #[arg(long, default_value = "admin")]
        owner: String,

        /// Write CSV here instead of printing JSON.
        #[arg(long)]
        csv: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List registered strategies.
    Strategies {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output_dir } => run_batch_cmd(&cli.store, &config, &output_dir),
        Commands::Build {
            partition,
            strategy,
            config,
        } => run_build_cmd(&cli.store, &partition, strategy.as_deref(), config.as_deref()),
        Commands::Signal {
            partition,
            strategy,
            date,
            config,
        } => run_signal_cmd(&cli.store, &partition, &strategy, date.as_deref(), config.as_deref()),
        Commands::Ledger {
            partition,
            strategy,
            owner,
            csv,
            config,
        } => run_ledger_cmd(
            &cli.store,
            &partition,
            &strategy,
            &owner,
            csv.as_deref(),
            config.as_deref(),
        ),
        Commands::Strategies { config } => run_strategies_cmd(config.as_deref()),
    }
}

fn run_batch_cmd(store_path: &Path, config_path: &Path, output_dir: &Path) -> Result<()> {
    let config = SimulationConfig::load(config_path)?;
    let store = Arc::new(open_store(store_path)?);

    let report = run_from_config(&config, Arc::clone(&store))?;
    print_batch_summary(&report);

    store
        .save_json(store_path)
        .with_context(|| format!("Failed to save store {}", store_path.display()))?;
    let paths = write_batch_artifacts(output_dir, &report)?;
    println!("Store saved to:     {}", store_path.display());
    println!("Artifacts saved to: {}", paths.report_json.display());

    if report.failed() > 0 {
        bail!("{} of {} jobs failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}

fn run_build_cmd(
    store_path: &Path,
    partition: &str,
    strategy: Option<&str>,
    config: Option<&Path>,
) -> Result<()> {
    let engine = open_engine(store_path, config)?;
    let partition = parse_partition(partition)?;

    let reports = match strategy {
        Some(s) => {
            let id = engine.registry().lookup(s)?.id;
            vec![engine.build_signals(&partition, id)?]
        }
        None => engine.build_all(&partition)?,
    };
    for report in &reports {
        print_build_report(report);
    }

    engine
        .store()
        .save_json(store_path)
        .with_context(|| format!("Failed to save store {}", store_path.display()))?;
    Ok(())
}

fn run_signal_cmd(
    store_path: &Path,
    partition: &str,
    strategy: &str,
    date: Option<&str>,
    config: Option<&Path>,
) -> Result<()> {
    let engine = open_engine(store_path, config)?;
    let partition = parse_partition(partition)?;
    let id = engine.registry().lookup(strategy)?.id;
    let date = date
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("date must be YYYY-MM-DD")?;

    let view = engine.get_signal(&partition, id, date)?;
    print_signal(&view);
    Ok(())
}

fn run_ledger_cmd(
    store_path: &Path,
    partition: &str,
    strategy: &str,
    owner: &str,
    csv: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let engine = open_engine(store_path, config)?;
    let partition = parse_partition(partition)?;
    let id = engine.registry().lookup(strategy)?.id;

    let entries = engine.get_ledger(&partition, id, &LedgerOwner::new(owner))?;
    match csv {
        Some(path) => {
            write_ledger_csv(path, &entries)?;
            println!("{} entries written to {}", entries.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

fn run_strategies_cmd(config: Option<&Path>) -> Result<()> {
    let registry = load_registry(config)?;
    println!(
        "{:<4} {:<20} {:<24} {:<18} {:<8} {:<6} Description",
        "Id", "Name", "Kind", "Inputs", "Order", "Delta"
    );
    println!("{}", "-".repeat(110));
    for def in registry.iter() {
        println!(
            "{:<4} {:<20} {:<24} {:<18} {:<8} {:<6} {}",
            def.id,
            def.name,
            def.kind.type_name(),
            input_columns(&def.kind),
            format!("{:?}", def.traversal).to_lowercase(),
            def.require_delta,
            def.description
        );
    }
    Ok(())
}

/// Inputs a strategy reads besides candles, e.g. `sentiment+forecast`.
fn input_columns(kind: &StrategyKind) -> String {
    let mut inputs = Vec::new();
    if kind.uses_sentiment() {
        inputs.push("sentiment");
    }
    if kind.uses_forecast() {
        inputs.push("forecast");
    }
    if inputs.is_empty() {
        "candles".into()
    } else {
        inputs.join("+")
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn open_store(path: &Path) -> Result<MarketStore> {
    MarketStore::open(path).with_context(|| format!("Failed to open store {}", path.display()))
}

fn load_registry(config: Option<&Path>) -> Result<StrategyRegistry> {
    match config {
        Some(path) => Ok(SimulationConfig::load(path)?.registry()?),
        None => Ok(StrategyRegistry::builtin()),
    }
}

fn open_engine(store_path: &Path, config: Option<&Path>) -> Result<SimulationEngine> {
    let store = Arc::new(open_store(store_path)?);
    match config {
        Some(path) => {
            let config = SimulationConfig::load(path)?;
            Ok(SimulationEngine::with_registry(store, config.registry()?)
                .with_owners(config.ledger_owners()))
        }
        None => Ok(SimulationEngine::new(store)),
    }
}

/// `ASSET/QUOTE/INTERVAL/SOURCE`.
fn parse_partition(s: &str) -> Result<PartitionKey> {
    let parts: Vec<&str> = s.split('/').collect();
    let [asset, quote, interval, source] = parts.as_slice() else {
        bail!("partition must be ASSET/QUOTE/INTERVAL/SOURCE, got '{s}'");
    };
    Ok(PartitionKey::new(asset, quote, interval, source)?)
}

fn print_batch_summary(report: &BatchReport) {
    println!();
    println!("=== Batch Result ===");
    println!("Run id:         {}", report.run_id);
    println!("Dataset hash:   {}", report.dataset_hash);
    println!(
        "Jobs:           {} ({} failed)",
        report.outcomes.len(),
        report.failed()
    );
    println!();
    println!(
        "{:<28} {:<20} {:<10} {:>8} {:>10} {:>10} {:>6}",
        "Partition", "Strategy", "Owner", "Records", "Return", "B&H", "Trades"
    );
    println!("{}", "-".repeat(98));
    for outcome in &report.outcomes {
        let records = outcome.report.as_ref().map_or(0, |r| r.records_written);
        if let Some(err) = &outcome.error {
            println!(
                "{:<28} {:<20} FAILED: {err}",
                outcome.key.partition.to_string(),
                outcome.strategy_name
            );
            continue;
        }
        for perf in &outcome.performance {
            println!(
                "{:<28} {:<20} {:<10} {:>8} {:>9.2}% {:>9.2}% {:>6}",
                outcome.key.partition.to_string(),
                outcome.strategy_name,
                perf.owner.to_string(),
                records,
                perf.strategy_return * rust_decimal::Decimal::ONE_HUNDRED,
                perf.buy_and_hold_return * rust_decimal::Decimal::ONE_HUNDRED,
                perf.trade_count
            );
        }
    }
    if report.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_build_report(report: &BuildReport) {
    println!(
        "{}: {} records, {} ledger entries ({} gap skips, {} insufficient) digest {}",
        report.key,
        report.records_written,
        report.ledger_entries,
        report.skipped_gaps,
        report.skipped_insufficient,
        report.digest
    );
}

fn print_signal(view: &SignalView) {
    let signal = view
        .signal
        .map(|s| s.to_string())
        .unwrap_or_else(|| "(seed)".into());
    println!("Strategy:       {}", view.strategy_name);
    println!("Date:           {}", view.date);
    println!("Close:          {}", view.period_close);
    if let Some(close) = view.comparison_period_close {
        println!("Compared to:    {close}");
    }
    if let Some(ratio) = view.sentiment_ratio {
        println!("Sentiment:      {ratio}");
    }
    println!("Signal:         {signal}");
    println!("Resolved:       {}", view.resolved_signal);
}
