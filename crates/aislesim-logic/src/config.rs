//! Tunable parameters for routing, scoring, optimization and search.
//!
//! Everything here has a sensible `Default`; callers override individual
//! fields and run the matching `validate` function, which returns every
//! problem found rather than stopping at the first.
//!
//! ```
//! use aislesim_logic::config::{MetricsConfig, RoutingConfig};
//!
//! let routing = RoutingConfig::default();
//! assert_eq!(routing.picker_speed, 2.0);
//! assert!(routing.validate().is_empty());
//!
//! let mut metrics = MetricsConfig::default();
//! metrics.weights.distance = 0.9;
//! assert!(!metrics.validate().is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance when checking that score weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

/// How the router picks among several entry/exit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointPolicy {
    /// Always the first listed entry and exit point.
    #[default]
    First,
    /// Entry nearest the shelf, exit nearest the packing station.
    Nearest,
}

impl EndpointPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Some(EndpointPolicy::First),
            "nearest" => Some(EndpointPolicy::Nearest),
            _ => None,
        }
    }
}

/// Picker time model and endpoint selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Cells per second.
    pub picker_speed: f64,
    /// Seconds spent picking at the shelf.
    pub pick_time: f64,
    /// Seconds spent packing at the station.
    pub pack_time: f64,
    pub endpoint_policy: EndpointPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            picker_speed: 2.0,
            pick_time: 1.5,
            pack_time: 2.0,
            endpoint_policy: EndpointPolicy::First,
        }
    }
}

impl RoutingConfig {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !positive(self.picker_speed) {
            errors.push(ConfigError::NonPositiveSpeed(self.picker_speed));
        }
        if !non_negative(self.pick_time) {
            errors.push(ConfigError::NegativeDuration {
                name: "pick_time",
                value: self.pick_time,
            });
        }
        if !non_negative(self.pack_time) {
            errors.push(ConfigError::NegativeDuration {
                name: "pack_time",
                value: self.pack_time,
            });
        }
        errors
    }
}

/// Blend weights for the composite efficiency score. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub distance: f64,
    pub layout: f64,
    pub entry: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            distance: 0.4,
            layout: 0.35,
            entry: 0.25,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.distance + self.layout + self.entry
    }
}

/// Normalization bounds for the efficiency sub-scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Average route length that scores zero. `None` means `2 × grid size`.
    pub max_expected_distance: Option<f64>,
    /// Average shelf→packing distance that scores zero.
    pub optimal_shelf_packing_distance: f64,
    /// Average entry→shelf distance that scores zero.
    pub optimal_entry_shelf_distance: f64,
    pub weights: ScoreWeights,
    /// Score reported for a batch with no routed orders.
    pub empty_batch_score: u8,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_expected_distance: None,
            optimal_shelf_packing_distance: 15.0,
            optimal_entry_shelf_distance: 20.0,
            weights: ScoreWeights::default(),
            empty_batch_score: 100,
        }
    }
}

impl MetricsConfig {
    /// The distance divisor for a grid, honoring the override.
    pub fn max_expected_distance_for(&self, grid_size: i32) -> f64 {
        self.max_expected_distance
            .unwrap_or(2.0 * f64::from(grid_size.max(1)))
    }

    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Some(max) = self.max_expected_distance {
            if !positive(max) {
                errors.push(ConfigError::NonPositiveDivisor {
                    name: "max_expected_distance",
                    value: max,
                });
            }
        }
        if !positive(self.optimal_shelf_packing_distance) {
            errors.push(ConfigError::NonPositiveDivisor {
                name: "optimal_shelf_packing_distance",
                value: self.optimal_shelf_packing_distance,
            });
        }
        if !positive(self.optimal_entry_shelf_distance) {
            errors.push(ConfigError::NonPositiveDivisor {
                name: "optimal_entry_shelf_distance",
                value: self.optimal_entry_shelf_distance,
            });
        }

        let w = &self.weights;
        for (name, value) in [
            ("distance", w.distance),
            ("layout", w.layout),
            ("entry", w.entry),
        ] {
            if !non_negative(value) {
                errors.push(ConfigError::NegativeWeight { name, value });
            }
        }
        if (w.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            errors.push(ConfigError::WeightSumInvalid(w.sum()));
        }

        errors
    }
}

/// Zone-heuristic optimizer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Empty cells kept between neighbouring zones.
    pub aisle_gap: i32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { aisle_gap: 2 }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.aisle_gap < 0 {
            errors.push(ConfigError::NegativeAisleGap(self.aisle_gap));
        }
        errors
    }
}

/// Seeded stochastic layout search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub seed: u64,
    /// Number of perturbations tried.
    pub iterations: u32,
    /// Probability of accepting a non-improving move.
    pub epsilon: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            iterations: 500,
            epsilon: 0.1,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.iterations == 0 {
            errors.push(ConfigError::ZeroIterations);
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            errors.push(ConfigError::EpsilonOutOfRange(self.epsilon));
        }
        errors
    }
}

/// Every tunable in one place. Missing sections and fields keep their
/// defaults, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub routing: RoutingConfig,
    pub metrics: MetricsConfig,
    pub optimizer: OptimizerConfig,
    pub search: SearchConfig,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn validate(&self) -> Vec<ConfigError> {
        let mut all = Vec::new();
        all.extend(self.routing.validate());
        all.extend(self.metrics.validate());
        all.extend(self.optimizer.validate());
        all.extend(self.search.validate());
        all
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Picker speed must be positive and finite.
    NonPositiveSpeed(f64),
    /// Pick or pack time below zero.
    NegativeDuration { name: &'static str, value: f64 },
    /// A normalization divisor must be positive.
    NonPositiveDivisor { name: &'static str, value: f64 },
    /// A score weight below zero.
    NegativeWeight { name: &'static str, value: f64 },
    /// Score weights must sum to 1.
    WeightSumInvalid(f64),
    NegativeAisleGap(i32),
    ZeroIterations,
    /// Epsilon must lie in [0, 1].
    EpsilonOutOfRange(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveSpeed(v) => {
                write!(f, "picker speed must be positive, got {}", v)
            }
            ConfigError::NegativeDuration { name, value } => {
                write!(f, "{} must not be negative, got {}", name, value)
            }
            ConfigError::NonPositiveDivisor { name, value } => {
                write!(f, "{} must be positive, got {}", name, value)
            }
            ConfigError::NegativeWeight { name, value } => {
                write!(f, "{} weight must not be negative, got {}", name, value)
            }
            ConfigError::WeightSumInvalid(sum) => {
                write!(f, "score weights must sum to 1, got {:.4}", sum)
            }
            ConfigError::NegativeAisleGap(gap) => {
                write!(f, "aisle gap must not be negative, got {}", gap)
            }
            ConfigError::ZeroIterations => write!(f, "search needs at least one iteration"),
            ConfigError::EpsilonOutOfRange(e) => {
                write!(f, "epsilon must be within [0, 1], got {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
