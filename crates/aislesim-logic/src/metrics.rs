//! Efficiency metrics over a batch of routed orders.
//!
//! Three sub-scores, each in `[0, 100]`, where shorter is better:
//!
//! | Sub-score  | Average measured      | Zero at (default)     |
//! |------------|-----------------------|-----------------------|
//! | distance   | whole route           | `2 × grid size`       |
//! | layout     | shelf → packing leg   | 15                    |
//! | entry      | entry → shelf leg     | 20                    |
//!
//! The efficiency score is their weighted average, rounded to an integer.
//! A batch with nothing routed reports the configured baseline (100).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{MetricsConfig, RoutingConfig, ScoreWeights};
use crate::grid::{categories, Layout, Position};
use crate::orders::{DemandWeights, Order};
use crate::routing::{route, BatchOutcome, OrderPath};

/// Outcome of one completed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub order_id: u32,
    pub category: String,
    pub shelf: Position,
    pub path_length: u32,
    pub time_taken: f64,
    /// entry→shelf, shelf→packing, packing→exit.
    pub leg_distances: [u32; 3],
}

impl From<&OrderPath> for Reading {
    fn from(path: &OrderPath) -> Self {
        Self {
            order_id: path.order_id,
            category: path.category.clone(),
            shelf: path.shelf,
            path_length: path.total_distance,
            time_taken: path.estimated_time,
            leg_distances: path.legs.map(|l| l.distance),
        }
    }
}

/// Per-category aggregate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub orders: usize,
    pub avg_distance: f64,
    pub avg_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub routed: usize,
    pub skipped: usize,
    pub total_distance: u64,
    pub total_time: f64,
    pub avg_distance: f64,
    pub avg_time: f64,
    pub avg_entry_to_shelf: f64,
    pub avg_shelf_to_packing: f64,
    pub avg_packing_to_exit: f64,
    pub distance_efficiency: f64,
    pub layout_efficiency: f64,
    pub entry_efficiency: f64,
    pub efficiency_score: u8,
    pub per_category: BTreeMap<String, CategoryStats>,
}

impl MetricsSummary {
    fn empty(config: &MetricsConfig) -> Self {
        let baseline = config.empty_batch_score.min(100);
        Self {
            routed: 0,
            skipped: 0,
            total_distance: 0,
            total_time: 0.0,
            avg_distance: 0.0,
            avg_time: 0.0,
            avg_entry_to_shelf: 0.0,
            avg_shelf_to_packing: 0.0,
            avg_packing_to_exit: 0.0,
            distance_efficiency: f64::from(baseline),
            layout_efficiency: f64::from(baseline),
            entry_efficiency: f64::from(baseline),
            efficiency_score: baseline,
            per_category: BTreeMap::new(),
        }
    }
}

/// `100 - avg / divisor × 100`, clamped to `[0, 100]`.
fn sub_score(avg: f64, divisor: f64) -> f64 {
    if divisor <= 0.0 || !divisor.is_finite() {
        return 0.0;
    }
    (100.0 - avg / divisor * 100.0).clamp(0.0, 100.0)
}

/// Weighted average of the three sub-scores, as an integer in `[0, 100]`.
///
/// Weights that cannot be normalized fall back to [`ScoreWeights::default`].
pub fn composite_score(distance: f64, layout: f64, entry: f64, weights: &ScoreWeights) -> u8 {
    let mut total = weights.sum();
    let mut weights = *weights;
    if total <= 0.0 || !total.is_finite() {
        log::warn!(
            "Score weights sum to {}; using default weights instead",
            total
        );
        weights = ScoreWeights::default();
        total = weights.sum();
    }
    let score =
        (distance * weights.distance + layout * weights.layout + entry * weights.entry) / total;
    score.round().clamp(0.0, 100.0) as u8
}

/// Aggregate readings for a layout.
///
/// ```
/// use aislesim_logic::config::MetricsConfig;
/// use aislesim_logic::grid::Layout;
/// use aislesim_logic::metrics::summarize;
///
/// let summary = summarize(&[], &Layout::new(10), &MetricsConfig::default());
/// assert_eq!(summary.efficiency_score, 100);
/// ```
pub fn summarize(
    readings: &[Reading],
    layout: &Layout,
    config: &MetricsConfig,
) -> MetricsSummary {
    if readings.is_empty() {
        return MetricsSummary::empty(config);
    }

    let n = readings.len() as f64;
    let total_distance: u64 = readings.iter().map(|r| u64::from(r.path_length)).sum();
    let total_time: f64 = readings.iter().map(|r| r.time_taken).sum();
    let mut leg_totals = [0u64; 3];
    for r in readings {
        for (total, leg) in leg_totals.iter_mut().zip(r.leg_distances) {
            *total += u64::from(leg);
        }
    }
    let [entry_to_shelf, shelf_to_packing, packing_to_exit] = leg_totals.map(|t| t as f64 / n);
    let avg_distance = total_distance as f64 / n;

    let distance_efficiency =
        sub_score(avg_distance, config.max_expected_distance_for(layout.grid_size));
    let layout_efficiency = sub_score(shelf_to_packing, config.optimal_shelf_packing_distance);
    let entry_efficiency = sub_score(entry_to_shelf, config.optimal_entry_shelf_distance);

    MetricsSummary {
        routed: readings.len(),
        skipped: 0,
        total_distance,
        total_time,
        avg_distance,
        avg_time: total_time / n,
        avg_entry_to_shelf: entry_to_shelf,
        avg_shelf_to_packing: shelf_to_packing,
        avg_packing_to_exit: packing_to_exit,
        distance_efficiency,
        layout_efficiency,
        entry_efficiency,
        efficiency_score: composite_score(
            distance_efficiency,
            layout_efficiency,
            entry_efficiency,
            &config.weights,
        ),
        per_category: per_category(readings),
    }
}

/// Summary of a routed batch, including how many orders were skipped.
pub fn summarize_batch(
    batch: &BatchOutcome,
    layout: &Layout,
    config: &MetricsConfig,
) -> MetricsSummary {
    let mut summary = summarize(&batch.readings(), layout, config);
    summary.skipped = batch.skipped();
    summary
}

fn per_category(readings: &[Reading]) -> BTreeMap<String, CategoryStats> {
    let mut sums: BTreeMap<String, (usize, u64, f64)> = BTreeMap::new();
    for r in readings {
        let entry = sums.entry(r.category.clone()).or_default();
        entry.0 += 1;
        entry.1 += u64::from(r.path_length);
        entry.2 += r.time_taken;
    }
    sums.into_iter()
        .map(|(category, (orders, distance, time))| {
            let n = orders as f64;
            let stats = CategoryStats {
                orders,
                avg_distance: distance as f64 / n,
                avg_time: time / n,
            };
            (category, stats)
        })
        .collect()
}

/// Demand-weighted mean route length over the layout's categories.
///
/// Each category is routed once from its first shelf. `None` when no
/// category can be routed. If every weight is zero the plain mean is used.
pub fn expected_travel(
    layout: &Layout,
    weights: &DemandWeights,
    routing: &RoutingConfig,
) -> Option<f64> {
    let mut weighted = 0.0;
    let mut weight_total = 0.0;
    let mut plain = 0.0;
    let mut routed = 0usize;

    for (i, category) in categories(layout).into_iter().enumerate() {
        let sample = Order::new(i as u32 + 1, category, "");
        let Ok(path) = route(&sample, layout, routing) else {
            continue;
        };
        let distance = f64::from(path.total_distance);
        let w = weights.weight(category);
        weighted += w * distance;
        weight_total += w;
        plain += distance;
        routed += 1;
    }

    if routed == 0 {
        None
    } else if weight_total > 0.0 {
        Some(weighted / weight_total)
    } else {
        Some(plain / routed as f64)
    }
}
