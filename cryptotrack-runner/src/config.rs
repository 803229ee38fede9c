//! Serializable batch configuration, loaded from TOML.
//!
//! ```toml
//! strategies = ["threshold_absolute", "3"]
//! owners = ["admin"]
//! parallel = true
//!
//! [[partitions]]
//! asset = "BTC"
//! quote = "USD"
//! interval = "1d"
//! source = "nomics"
//! candles = "btc_usd_1d.csv"
//!
//! [[sentiment]]
//! interval = "1d"
//! path = "bitcoin_trend.csv"
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use cryptotrack_core::domain::{Interval, LedgerOwner, PartitionKey, StrategyId};
use cryptotrack_core::strategy::{StrategyDefinition, StrategyRegistry};
use cryptotrack_core::SimulationError;

/// Unique identifier for a batch configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Top-level batch configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub partitions: Vec<PartitionConfig>,

    /// Strategy ids or names to build. Empty means every registered strategy.
    #[serde(default)]
    pub strategies: Vec<String>,

    /// Ledger owners. Empty means the default owner only.
    #[serde(default)]
    pub owners: Vec<String>,

    #[serde(default)]
    pub sentiment: Vec<SentimentSource>,

    #[serde(default)]
    pub forecasts: Vec<ForecastSource>,

    /// Definitions added to (or replacing) the built-in registry by id.
    #[serde(default)]
    pub strategy_overrides: Vec<StrategyDefinition>,

    /// Run independent partitions on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_parallel() -> bool {
    true
}

/// One candle series and where its candles come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartitionConfig {
    pub asset: String,
    pub quote: String,
    pub interval: String,
    pub source: String,
    /// CSV file with `timestamp,open,high,low,close,volume` columns.
    #[serde(default)]
    pub candles: Option<PathBuf>,
    /// Generate a random walk instead of reading a file.
    #[serde(default)]
    pub synthetic: Option<SyntheticConfig>,
}

/// Upper bound on `periods` of a synthetic series.
pub const MAX_SYNTHETIC_PERIODS: usize = 100_000;

/// Parameters of a generated random-walk series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyntheticConfig {
    pub start: NaiveDate,
    pub periods: usize,
    #[serde(default = "default_start_price")]
    pub start_price: Decimal,
}

fn default_start_price() -> Decimal {
    Decimal::ONE_HUNDRED
}

/// CSV file with `date,first_score,second_score[,is_partial]` columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentSource {
    pub interval: String,
    pub path: PathBuf,
}

/// CSV file with `date,predicted_value,predicted_change` columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastSource {
    pub asset: String,
    /// Strategy id or name the forecast was produced for.
    pub strategy: String,
    pub path: PathBuf,
}

impl SimulationConfig {
    /// Parse and validate a TOML document. Relative paths resolve against the
    /// working directory.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions.is_empty() {
            return Err(ConfigError::Invalid("no partitions configured".into()));
        }
        for p in &self.partitions {
            let key = p.key()?;
            match (&p.candles, &p.synthetic) {
                (None, None) => {
                    return Err(ConfigError::Invalid(format!(
                        "partition {key} needs a candles file or a synthetic section"
                    )))
                }
                (Some(_), Some(_)) => {
                    return Err(ConfigError::Invalid(format!(
                        "partition {key} has both a candles file and a synthetic section"
                    )))
                }
                (None, Some(s))
                    if s.periods == 0
                        || s.periods > MAX_SYNTHETIC_PERIODS
                        || s.start_price <= Decimal::ZERO =>
                {
                    return Err(ConfigError::Invalid(format!(
                        "partition {key}: synthetic series needs 1..={MAX_SYNTHETIC_PERIODS} periods and a positive start price"
                    )))
                }
                _ => {}
            }
        }
        for s in &self.sentiment {
            s.interval.parse::<Interval>()?;
        }
        self.strategy_ids(&self.registry()?)?;
        Ok(())
    }

    /// Resolve `path` against the config file's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn partition_keys(&self) -> Result<Vec<PartitionKey>, ConfigError> {
        self.partitions.iter().map(PartitionConfig::key).collect()
    }

    /// Built-in strategies with the configured overrides applied.
    pub fn registry(&self) -> Result<StrategyRegistry, ConfigError> {
        let mut registry = StrategyRegistry::builtin();
        for def in &self.strategy_overrides {
            registry.register(def.clone())?;
        }
        Ok(registry)
    }

    /// Strategy ids to build, in id order, without duplicates.
    pub fn strategy_ids(&self, registry: &StrategyRegistry) -> Result<Vec<StrategyId>, ConfigError> {
        if self.strategies.is_empty() {
            return Ok(registry.ids());
        }
        let mut ids = self
            .strategies
            .iter()
            .map(|s| registry.lookup(s).map(|d| d.id))
            .collect::<Result<Vec<_>, _>>()?;
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    pub fn ledger_owners(&self) -> Vec<LedgerOwner> {
        self.owners.iter().map(LedgerOwner::new).collect()
    }

    /// Deterministic hash of this configuration.
    ///
    /// Two batches with identical configs get the same id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

impl PartitionConfig {
    pub fn key(&self) -> Result<PartitionKey, ConfigError> {
        Ok(PartitionKey::new(
            &self.asset,
            &self.quote,
            &self.interval,
            &self.source,
        )?)
    }
}
