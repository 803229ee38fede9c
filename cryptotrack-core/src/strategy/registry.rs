//! Strategy registry — resolves identifiers to definitions.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{DeltaMode, StrategyDefinition, StrategyKind, Traversal};
use crate::domain::StrategyId;
use crate::error::SimulationError;

/// Ratio of the two search-interest scores above which sentiment is bullish.
pub const DEFAULT_SENTIMENT_THRESHOLD: Decimal = Decimal::from_parts(35, 0, 0, false, 2);

/// Absolute close-to-close move required by `threshold_absolute`.
pub const DEFAULT_ABSOLUTE_THRESHOLD: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

/// Relative close-to-close move required by `threshold_relative`.
pub const DEFAULT_RELATIVE_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Definitions keyed by id, iterated in id order.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    definitions: BTreeMap<StrategyId, StrategyDefinition>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The five built-in strategies. Ids are stable across releases.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let builtins = [
            StrategyDefinition {
                id: StrategyId(1),
                name: "threshold_absolute".into(),
                description: "Buy when search sentiment and the absolute daily move both clear their thresholds".into(),
                traversal: Traversal::Forward,
                require_delta: true,
                kind: StrategyKind::ThresholdDelta {
                    delta_mode: DeltaMode::Absolute,
                    price_threshold: DEFAULT_ABSOLUTE_THRESHOLD,
                    sentiment_threshold: DEFAULT_SENTIMENT_THRESHOLD,
                },
            },
            StrategyDefinition {
                id: StrategyId(2),
                name: "threshold_relative".into(),
                description: "Buy when search sentiment and the percentage daily move both clear their thresholds".into(),
                traversal: Traversal::Forward,
                require_delta: true,
                kind: StrategyKind::ThresholdDelta {
                    delta_mode: DeltaMode::Relative,
                    price_threshold: DEFAULT_RELATIVE_THRESHOLD,
                    sentiment_threshold: DEFAULT_SENTIMENT_THRESHOLD,
                },
            },
            StrategyDefinition {
                id: StrategyId(3),
                name: "hindsight".into(),
                description: "Label each candle with the direction of the next close (upper bound)".into(),
                traversal: Traversal::Reverse,
                require_delta: false,
                kind: StrategyKind::Hindsight,
            },
            StrategyDefinition {
                id: StrategyId(4),
                name: "forecast".into(),
                description: "Follow the sign of the forecast change for the next period".into(),
                traversal: Traversal::Reverse,
                require_delta: false,
                kind: StrategyKind::Forecast,
            },
            StrategyDefinition {
                id: StrategyId(5),
                name: "forecast_sentiment".into(),
                description: "Forecast direction, overridden to buy on strong search sentiment".into(),
                traversal: Traversal::Reverse,
                require_delta: false,
                kind: StrategyKind::ForecastWithSentiment {
                    sentiment_threshold: DEFAULT_SENTIMENT_THRESHOLD,
                },
            },
        ];
        for def in builtins {
            registry.definitions.insert(def.id, def);
        }
        registry
    }

    /// Add or replace a definition. Names must stay unique across ids.
    pub fn register(&mut self, def: StrategyDefinition) -> Result<(), SimulationError> {
        if def.name.trim().is_empty() {
            return Err(SimulationError::configuration(format!(
                "strategy {} has an empty name",
                def.id
            )));
        }
        if let Some(existing) = self
            .definitions
            .values()
            .find(|d| d.name == def.name && d.id != def.id)
        {
            return Err(SimulationError::configuration(format!(
                "strategy name '{}' already used by id {}",
                def.name, existing.id
            )));
        }
        if let StrategyKind::ThresholdDelta {
            sentiment_threshold,
            ..
        }
        | StrategyKind::ForecastWithSentiment {
            sentiment_threshold,
        } = &def.kind
        {
            if sentiment_threshold.is_sign_negative() {
                return Err(SimulationError::configuration(format!(
                    "strategy '{}' has a negative sentiment threshold",
                    def.name
                )));
            }
        }
        self.definitions.insert(def.id, def);
        Ok(())
    }

    pub fn resolve(&self, id: StrategyId) -> Result<&StrategyDefinition, SimulationError> {
        self.definitions
            .get(&id)
            .ok_or_else(|| SimulationError::configuration(format!("unknown strategy id {id}")))
    }

    pub fn resolve_name(&self, name: &str) -> Result<&StrategyDefinition, SimulationError> {
        self.definitions
            .values()
            .find(|d| d.name == name)
            .ok_or_else(|| SimulationError::configuration(format!("unknown strategy '{name}'")))
    }

    /// Resolve either a numeric id or a name.
    pub fn lookup(&self, id_or_name: &str) -> Result<&StrategyDefinition, SimulationError> {
        match id_or_name.trim().parse::<u32>() {
            Ok(id) => self.resolve(StrategyId(id)),
            Err(_) => self.resolve_name(id_or_name.trim()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &StrategyDefinition> {
        self.definitions.values()
    }

    pub fn ids(&self) -> Vec<StrategyId> {
        self.definitions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
