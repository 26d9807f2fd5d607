//! Demand-driven zone layout.
//!
//! Rebuilds a layout so that frequently ordered categories sit close to the
//! entry. Deterministic; not guaranteed optimal.
//!
//! 1. Group shelves by category and sort categories by descending demand
//!    (ties keep first-appearance order).
//! 2. Lay each category out as a compact rectangular zone, keeping an aisle
//!    of `aisle_gap` empty cells between zones. Each zone goes as near the
//!    entry as it can while its centroid stays no nearer than the previous
//!    zone's.
//! 3. Packing stations go on the free cell nearest the busiest zone's
//!    centroid, extra stations next to the following zones.
//! 4. Charging stations go on the free cells nearest the midpoints between
//!    successive zone centroids.
//! 5. One entry at `(0, 0)`, one exit at `(n-1, n-1)`.
//!
//! A category whose zone no longer fits is scattered over the free cells
//! nearest the entry.
//!
//! Moving the endpoints to the corners can make a compact layout worse.
//! [`optimize_layout`] does not check this; [`compare_layouts`] scores both
//! layouts on real orders and keeps the original when the rebuilt one routes
//! fewer orders or has a longer average route.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::config::{EngineConfig, OptimizerConfig};
use crate::grid::{check_grid, GridError, Layout, Position, Shelf};
use crate::metrics::{summarize_batch, MetricsSummary};
use crate::orders::{DemandWeights, Order};
use crate::routing::route_batch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizeError {
    /// The grid has fewer cells than the layout has elements.
    InsufficientSpace { needed: usize, available: usize },
    Grid(GridError),
}

impl fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizeError::InsufficientSpace { needed, available } => write!(
                f,
                "layout needs {} cells but the grid only has {}",
                needed, available
            ),
            OptimizeError::Grid(e) => write!(f, "grid error: {}", e),
        }
    }
}

impl std::error::Error for OptimizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OptimizeError::Grid(e) => Some(e),
            OptimizeError::InsufficientSpace { .. } => None,
        }
    }
}

impl From<GridError> for OptimizeError {
    fn from(e: GridError) -> Self {
        OptimizeError::Grid(e)
    }
}

// ── Geometry helpers ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    row: i32,
    col: i32,
    height: i32,
    width: i32,
}

impl Rect {
    fn expanded(self, gap: i32) -> Rect {
        Rect {
            row: self.row - gap,
            col: self.col - gap,
            height: self.height + 2 * gap,
            width: self.width + 2 * gap,
        }
    }

    fn intersects(self, other: Rect) -> bool {
        self.row < other.row + other.height
            && other.row < self.row + self.height
            && self.col < other.col + other.width
            && other.col < self.col + self.width
    }

    /// The first `count` cells in row-major order.
    fn fill(self, count: usize) -> Vec<Position> {
        (self.row..self.row + self.height)
            .flat_map(|r| (self.col..self.col + self.width).map(move |c| Position::new(r, c)))
            .take(count)
            .collect()
    }
}

type Point = (f64, f64);

fn centroid(cells: &[Position]) -> Point {
    if cells.is_empty() {
        return (0.0, 0.0);
    }
    let n = cells.len() as f64;
    let rows: f64 = cells.iter().map(|p| f64::from(p.row)).sum();
    let cols: f64 = cells.iter().map(|p| f64::from(p.col)).sum();
    (rows / n, cols / n)
}

fn distance_to(point: Point, pos: Position) -> f64 {
    (point.0 - f64::from(pos.row)).abs() + (point.1 - f64::from(pos.col)).abs()
}

fn midpoint(a: Point, b: Point) -> Point {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

fn as_point(pos: Position) -> Point {
    (f64::from(pos.row), f64::from(pos.col))
}

/// Rectangle shapes `(height, width)` that hold `count` cells on an `n`-grid,
/// squarest first.
fn zone_shapes(count: usize, n: i32) -> Vec<(i32, i32)> {
    let side = n.max(0) as usize;
    let mut shapes: Vec<(i32, i32)> = (1..=count.min(side))
        .filter_map(|width| {
            let height = count.div_ceil(width);
            (height <= side).then_some((height as i32, width as i32))
        })
        .collect();
    shapes.sort_by_key(|&(h, w)| ((h - w).abs(), h));
    shapes
}

// ── Planner ─────────────────────────────────────────────────────────────

/// One category's block of shelves.
#[derive(Debug, Clone)]
struct Zone {
    category: String,
    cells: Vec<Position>,
    centroid: Point,
}

struct Candidate {
    distance: f64,
    rect: Rect,
}

struct Planner {
    grid_size: i32,
    entry: Position,
    aisle_gap: i32,
    occupied: HashSet<Position>,
    rects: Vec<Rect>,
}

impl Planner {
    fn is_free(&self, pos: Position) -> bool {
        !self.occupied.contains(&pos)
    }

    fn free_cells(&self) -> impl Iterator<Item = Position> + '_ {
        let n = self.grid_size;
        (0..n)
            .flat_map(move |r| (0..n).map(move |c| Position::new(r, c)))
            .filter(|p| self.is_free(*p))
    }

    /// Free cell nearest `target`; row-major order breaks ties.
    ///
    /// Scans a window around `target` that doubles until the best free cell
    /// is no farther than the window's reach.
    fn nearest_free(&self, target: Point) -> Option<Position> {
        let n = self.grid_size;
        let (row, col) = (target.0.round() as i32, target.1.round() as i32);
        let mut reach = 4;
        loop {
            let rows = row.saturating_sub(reach).max(0)..=row.saturating_add(reach).min(n - 1);
            let cols = col.saturating_sub(reach).max(0)..=col.saturating_add(reach).min(n - 1);
            let covers_grid = *rows.start() == 0
                && *cols.start() == 0
                && *rows.end() == n - 1
                && *cols.end() == n - 1;

            let mut best: Option<(f64, Position)> = None;
            for r in rows {
                for c in cols.clone() {
                    let pos = Position::new(r, c);
                    if !self.is_free(pos) {
                        continue;
                    }
                    let d = distance_to(target, pos);
                    if best.map_or(true, |(bd, _)| d < bd) {
                        best = Some((d, pos));
                    }
                }
            }

            // Cells outside the window are at least `reach + 0.5` away.
            let settled = best.map_or(false, |(d, _)| d < f64::from(reach) + 0.5);
            if settled || covers_grid {
                return best.map(|(_, pos)| pos);
            }
            reach = reach.saturating_mul(2);
        }
    }

    fn claim(&mut self, pos: Position) {
        self.occupied.insert(pos);
    }

    /// Best rectangle for `count` shelves whose centroid is at least
    /// `min_distance` from the entry, or the nearest one if none is.
    ///
    /// The entry is the origin, so a rectangle whose corner lies past `reach`
    /// on either axis is farther than `reach`. The scan widens until the
    /// monotone pick is within reach or the whole grid has been seen.
    fn find_zone(&self, count: usize, min_distance: f64) -> Option<Rect> {
        let shapes = zone_shapes(count, self.grid_size);
        let side = (count as f64).sqrt().ceil() as i32;
        let mut reach = (2 * side + self.aisle_gap).max(min_distance.ceil() as i32 + side);
        loop {
            let covers_grid = reach >= self.grid_size;
            let (monotone, any) = self.scan_zones(&shapes, count, min_distance, reach);
            let settled = monotone
                .as_ref()
                .map_or(false, |c| c.distance <= f64::from(reach));
            if settled || covers_grid {
                if monotone.is_none() && any.is_some() {
                    log::warn!(
                        "No zone of {} shelves keeps demand order; using nearest placement",
                        count
                    );
                }
                return monotone.or(any).map(|c| c.rect);
            }
            reach = reach.saturating_mul(2);
        }
    }

    /// Nearest monotone and nearest overall candidates with their corner
    /// within `reach` of the origin. Shape, then row-major order breaks ties.
    fn scan_zones(
        &self,
        shapes: &[(i32, i32)],
        count: usize,
        min_distance: f64,
        reach: i32,
    ) -> (Option<Candidate>, Option<Candidate>) {
        let mut monotone: Option<Candidate> = None;
        let mut any: Option<Candidate> = None;

        for &(height, width) in shapes {
            for row in 0..=(self.grid_size - height).min(reach) {
                for col in 0..=(self.grid_size - width).min(reach) {
                    let rect = Rect {
                        row,
                        col,
                        height,
                        width,
                    };
                    if self
                        .rects
                        .iter()
                        .any(|r| r.expanded(self.aisle_gap).intersects(rect))
                    {
                        continue;
                    }
                    let cells = rect.fill(count);
                    if !cells.iter().all(|c| self.is_free(*c)) {
                        continue;
                    }
                    let distance = distance_to(centroid(&cells), self.entry);
                    let candidate = || Candidate { distance, rect };
                    if distance >= min_distance
                        && monotone.as_ref().map_or(true, |b| distance < b.distance)
                    {
                        monotone = Some(candidate());
                    }
                    if any.as_ref().map_or(true, |b| distance < b.distance) {
                        any = Some(candidate());
                    }
                }
            }
        }
        (monotone, any)
    }

    fn place_zone(&mut self, category: &str, count: usize, min_distance: f64) -> Option<Zone> {
        let cells = match self.find_zone(count, min_distance) {
            Some(rect) => {
                self.rects.push(rect);
                rect.fill(count)
            }
            None => {
                log::warn!(
                    "Zone for '{}' does not fit; scattering {} shelves near the entry",
                    category,
                    count
                );
                let mut free: Vec<Position> = self.free_cells().collect();
                free.sort_by_key(|p| (p.manhattan(self.entry), *p));
                if free.len() < count {
                    return None;
                }
                free.truncate(count);
                free
            }
        };
        for &c in &cells {
            self.claim(c);
        }
        Some(Zone {
            category: category.to_string(),
            centroid: centroid(&cells),
            cells,
        })
    }
}

/// Categories with their shelf counts, highest demand first.
fn demand_order(layout: &Layout, weights: &DemandWeights) -> Vec<(String, usize)> {
    let mut groups: Vec<(String, usize)> = Vec::new();
    for shelf in &layout.shelves {
        match groups.iter_mut().find(|(c, _)| *c == shelf.category) {
            Some((_, n)) => *n += 1,
            None => groups.push((shelf.category.clone(), 1)),
        }
    }
    // Stable: equal weights keep first-appearance order.
    groups.sort_by(|a, b| weights.weight(&b.0).total_cmp(&weights.weight(&a.0)));
    groups
}

/// Build a demand-ordered layout from `original`. The input is not modified.
///
/// ```
/// use aislesim_logic::config::OptimizerConfig;
/// use aislesim_logic::grid::Layout;
/// use aislesim_logic::optimizer::optimize_layout;
/// use aislesim_logic::orders::DemandWeights;
///
/// let layout = Layout::new(10)
///     .with_shelf(9, 9, "rare")
///     .with_shelf(8, 8, "popular")
///     .with_packing(5, 5)
///     .with_entry(0, 0)
///     .with_exit(9, 0);
/// let weights = DemandWeights::from_pairs([("popular", 10.0), ("rare", 1.0)]);
/// let optimized = optimize_layout(&layout, &weights, &OptimizerConfig::default()).unwrap();
/// assert_eq!(optimized.shelves[0].category, "popular");
/// assert_eq!(optimized.shelves.len(), 2);
/// ```
pub fn optimize_layout(
    original: &Layout,
    weights: &DemandWeights,
    config: &OptimizerConfig,
) -> Result<Layout, OptimizeError> {
    let n = original.grid_size;
    check_grid(n)?;

    let packing_count = original.packing_stations.len().max(1);
    let charging_count = original.charging_stations.len();
    let needed = original.shelves.len() + packing_count + charging_count + 2;
    let available = (n as usize).saturating_mul(n as usize);
    let no_space = OptimizeError::InsufficientSpace { needed, available };
    if needed > available {
        return Err(no_space);
    }

    let entry = Position::new(0, 0);
    let exit = Position::new(n - 1, n - 1);
    let mut planner = Planner {
        grid_size: n,
        entry,
        aisle_gap: config.aisle_gap.max(0),
        occupied: HashSet::from([entry, exit]),
        rects: Vec::new(),
    };

    let mut zones: Vec<Zone> = Vec::new();
    for (category, count) in demand_order(original, weights) {
        let min_distance = zones
            .last()
            .map_or(0.0, |z| distance_to(z.centroid, entry));
        let zone = planner
            .place_zone(&category, count, min_distance)
            .ok_or_else(|| no_space.clone())?;
        zones.push(zone);
    }

    let mut packing_stations = Vec::with_capacity(packing_count);
    for i in 0..packing_count {
        let target = zones.get(i % zones.len().max(1)).map_or(as_point(entry), |z| z.centroid);
        let pos = planner
            .nearest_free(target)
            .ok_or_else(|| no_space.clone())?;
        planner.claim(pos);
        packing_stations.push(pos);
    }

    let mut charging_targets: Vec<Point> = zones
        .windows(2)
        .map(|pair| midpoint(pair[0].centroid, pair[1].centroid))
        .collect();
    if charging_targets.is_empty() {
        let from = zones.first().map_or(as_point(entry), |z| z.centroid);
        charging_targets.push(midpoint(from, as_point(exit)));
    }
    let mut charging_stations = Vec::with_capacity(charging_count);
    for i in 0..charging_count {
        let pos = planner
            .nearest_free(charging_targets[i % charging_targets.len()])
            .ok_or_else(|| no_space.clone())?;
        planner.claim(pos);
        charging_stations.push(pos);
    }

    let shelves = zones
        .iter()
        .flat_map(|z| z.cells.iter().map(|c| Shelf::new(c.row, c.col, z.category.clone())))
        .collect();

    log::info!(
        "Optimized layout: {} zones, {} packing, {} charging on a {}×{} grid",
        zones.len(),
        packing_stations.len(),
        charging_stations.len(),
        n,
        n
    );

    Ok(Layout {
        grid_size: n,
        shelves,
        packing_stations,
        entry_points: vec![entry],
        exit_points: vec![exit],
        charging_stations,
    })
}

// ── Comparison ──────────────────────────────────────────────────────────

/// How much the optimized layout improved on the original.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
    /// Positive when average route distance went down.
    pub distance_reduction_pct: f64,
    /// Positive when average order time went down.
    pub time_reduction_pct: f64,
    pub score_delta: i32,
}

fn reduction_pct(before: f64, after: f64) -> f64 {
    if before > 0.0 {
        (before - after) / before * 100.0
    } else {
        0.0
    }
}

impl Improvement {
    pub fn between(original: &MetricsSummary, optimized: &MetricsSummary) -> Self {
        Self {
            distance_reduction_pct: reduction_pct(original.avg_distance, optimized.avg_distance),
            time_reduction_pct: reduction_pct(original.avg_time, optimized.avg_time),
            score_delta: i32::from(optimized.efficiency_score)
                - i32::from(original.efficiency_score),
        }
    }
}

/// Original and optimized layouts side by side, scored on the same orders.
///
/// The optimized side never costs more than the original.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub original_layout: Layout,
    pub optimized_layout: Layout,
    pub original_metrics: MetricsSummary,
    pub optimized_metrics: MetricsSummary,
    pub improvement: Improvement,
    /// The zone layout scored worse, so `optimized_layout` is the original.
    pub kept_original: bool,
}

fn is_worse(candidate: &MetricsSummary, baseline: &MetricsSummary) -> bool {
    candidate.routed < baseline.routed || candidate.avg_distance > baseline.avg_distance
}

/// Optimize `original` and score both layouts against `orders`.
///
/// When the zone layout routes fewer orders or has a longer average route,
/// the original is reported as the optimized layout with zero improvement
/// and `kept_original` set.
pub fn compare_layouts(
    original: &Layout,
    weights: &DemandWeights,
    orders: &[Order],
    config: &EngineConfig,
) -> Result<ComparisonReport, OptimizeError> {
    let zoned = optimize_layout(original, weights, &config.optimizer)?;

    let score = |layout: &Layout| {
        let batch = route_batch(orders, layout, &config.routing);
        summarize_batch(&batch, layout, &config.metrics)
    };
    let original_metrics = score(original);
    let zoned_metrics = score(&zoned);

    let kept_original = is_worse(&zoned_metrics, &original_metrics);
    let (optimized, optimized_metrics) = if kept_original {
        log::warn!(
            "Zone layout is worse (avg distance {:.1} vs {:.1}, {} vs {} routed); keeping original",
            zoned_metrics.avg_distance,
            original_metrics.avg_distance,
            zoned_metrics.routed,
            original_metrics.routed
        );
        (original.clone(), original_metrics.clone())
    } else {
        (zoned, zoned_metrics)
    };
    let improvement = Improvement::between(&original_metrics, &optimized_metrics);

    log::info!(
        "Layout comparison: score {} -> {}, distance {:+.1}%",
        original_metrics.efficiency_score,
        optimized_metrics.efficiency_score,
        -improvement.distance_reduction_pct
    );

    Ok(ComparisonReport {
        original_layout: original.clone(),
        optimized_layout: optimized,
        original_metrics,
        optimized_metrics,
        improvement,
        kept_original,
    })
}
