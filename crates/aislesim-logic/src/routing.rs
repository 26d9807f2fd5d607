//! Order routing: entry → shelf → packing station → exit.
//!
//! Each order is resolved against the layout independently. The routing
//! config is checked first ([`RoutingError::Config`]), then resolution
//! order is fixed and each step has its own failure:
//!
//! 1. entry point: [`RoutingError::NoEntryPoint`]
//! 2. first shelf of the order's category: [`RoutingError::NoMatchingShelf`]
//! 3. packing station nearest that shelf: [`RoutingError::NoPackingStation`]
//! 4. exit point: [`RoutingError::NoExitPoint`]
//!
//! Leg lengths are Manhattan distances; the time estimate is
//! `distance / picker_speed + pick_time + pack_time`.
//!
//! ```
//! use aislesim_logic::config::RoutingConfig;
//! use aislesim_logic::grid::Layout;
//! use aislesim_logic::orders::Order;
//! use aislesim_logic::routing::route;
//!
//! let layout = Layout::new(10)
//!     .with_entry(0, 0)
//!     .with_shelf(3, 3, "X")
//!     .with_packing(5, 5)
//!     .with_exit(9, 9);
//! let order = Order::new(1, "X", "widget");
//! let path = route(&order, &layout, &RoutingConfig::default()).unwrap();
//! assert_eq!(path.total_distance, 18);
//! assert_eq!(path.estimated_time, 12.5);
//! ```

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ConfigError, EndpointPolicy, RoutingConfig};
use crate::grid::{check_bounds, check_grid, GridError, Layout, Position, Shelf};
use crate::metrics::Reading;
use crate::orders::Order;
use crate::pathfinding::{shortest_distance, trace_route};

/// One straight Manhattan segment of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub from: Position,
    pub to: Position,
    pub distance: u32,
}

impl Leg {
    fn between(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            distance: shortest_distance(from, to),
        }
    }
}

/// The resolved journey for one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPath {
    pub order_id: u32,
    pub category: String,
    pub entry: Position,
    pub shelf: Position,
    pub packing: Position,
    pub exit: Position,
    pub total_distance: u32,
    /// Seconds.
    pub estimated_time: f64,
    /// entry→shelf, shelf→packing, packing→exit.
    pub legs: [Leg; 3],
}

impl OrderPath {
    pub fn waypoints(&self) -> [Position; 4] {
        [self.entry, self.shelf, self.packing, self.exit]
    }

    /// Every cell walked, for drawing the route.
    pub fn trace(&self, grid_size: i32) -> Result<Vec<Position>, GridError> {
        trace_route(&self.waypoints(), grid_size)
    }
}

/// Broad class of a routing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A structural element the route needs is missing.
    InvalidLayout,
    /// No shelf stocks the order's category.
    UnroutableOrder,
    /// The grid or a coordinate on it is unusable.
    DegenerateGrid,
    /// Routing tunables are out of range.
    InvalidConfig,
}

/// Why a single order could not be routed.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingError {
    NoEntryPoint,
    NoMatchingShelf { category: String },
    NoPackingStation,
    NoExitPoint,
    Grid(GridError),
    Config(ConfigError),
}

impl RoutingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoutingError::NoEntryPoint
            | RoutingError::NoPackingStation
            | RoutingError::NoExitPoint => ErrorKind::InvalidLayout,
            RoutingError::NoMatchingShelf { .. } => ErrorKind::UnroutableOrder,
            RoutingError::Grid(_) => ErrorKind::DegenerateGrid,
            RoutingError::Config(_) => ErrorKind::InvalidConfig,
        }
    }
}

impl From<GridError> for RoutingError {
    fn from(e: GridError) -> Self {
        RoutingError::Grid(e)
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::NoEntryPoint => write!(f, "layout has no entry point"),
            RoutingError::NoMatchingShelf { category } => {
                write!(f, "no shelf stocks category '{}'", category)
            }
            RoutingError::NoPackingStation => write!(f, "layout has no packing station"),
            RoutingError::NoExitPoint => write!(f, "layout has no exit point"),
            RoutingError::Grid(e) => write!(f, "grid error: {}", e),
            RoutingError::Config(e) => write!(f, "invalid routing config: {}", e),
        }
    }
}

impl std::error::Error for RoutingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RoutingError::Grid(e) => Some(e),
            RoutingError::Config(e) => Some(e),
            _ => None,
        }
    }
}

// ── Resolution steps ────────────────────────────────────────────────────

/// First shelf in layout order stocking `category`.
pub fn find_shelf<'a>(layout: &'a Layout, category: &str) -> Option<&'a Shelf> {
    layout.shelves.iter().find(|s| s.category == category)
}

/// Packing station nearest `shelf`; the earliest listed wins a tie.
pub fn nearest_packing(layout: &Layout, shelf: Position) -> Option<Position> {
    nearest(&layout.packing_stations, shelf)
}

/// Entry point for a pick at `shelf` under `policy`.
pub fn select_entry(
    layout: &Layout,
    shelf: Position,
    policy: EndpointPolicy,
) -> Option<Position> {
    match policy {
        EndpointPolicy::First => layout.entry_points.first().copied(),
        EndpointPolicy::Nearest => nearest(&layout.entry_points, shelf),
    }
}

/// Exit point after packing at `packing` under `policy`.
pub fn select_exit(
    layout: &Layout,
    packing: Position,
    policy: EndpointPolicy,
) -> Option<Position> {
    match policy {
        EndpointPolicy::First => layout.exit_points.first().copied(),
        EndpointPolicy::Nearest => nearest(&layout.exit_points, packing),
    }
}

fn nearest(candidates: &[Position], target: Position) -> Option<Position> {
    // min_by_key keeps the first of equal minima.
    candidates
        .iter()
        .copied()
        .min_by_key(|&p| shortest_distance(p, target))
}

/// Route a single order. Pure: same inputs, same output.
pub fn route(
    order: &Order,
    layout: &Layout,
    config: &RoutingConfig,
) -> Result<OrderPath, RoutingError> {
    if let Some(e) = config.validate().into_iter().next() {
        return Err(RoutingError::Config(e));
    }
    check_grid(layout.grid_size)?;

    if layout.entry_points.is_empty() {
        return Err(RoutingError::NoEntryPoint);
    }
    let shelf = find_shelf(layout, &order.category)
        .ok_or_else(|| RoutingError::NoMatchingShelf {
            category: order.category.clone(),
        })?
        .position;
    let packing = nearest_packing(layout, shelf).ok_or(RoutingError::NoPackingStation)?;
    let exit =
        select_exit(layout, packing, config.endpoint_policy).ok_or(RoutingError::NoExitPoint)?;
    let entry =
        select_entry(layout, shelf, config.endpoint_policy).ok_or(RoutingError::NoEntryPoint)?;

    for p in [entry, shelf, packing, exit] {
        check_bounds(layout.grid_size, p)?;
    }

    let legs = [
        Leg::between(entry, shelf),
        Leg::between(shelf, packing),
        Leg::between(packing, exit),
    ];
    let total_distance: u32 = legs.iter().map(|l| l.distance).sum();

    Ok(OrderPath {
        order_id: order.id,
        category: order.category.clone(),
        entry,
        shelf,
        packing,
        exit,
        total_distance,
        estimated_time: estimate_time(total_distance, config),
        legs,
    })
}

/// Seconds to walk `distance` cells, pick and pack.
///
/// Expects a config that passes [`RoutingConfig::validate`]; [`route`]
/// checks this before calling it.
pub fn estimate_time(distance: u32, config: &RoutingConfig) -> f64 {
    f64::from(distance) / config.picker_speed + config.pick_time + config.pack_time
}

// ── Batches ─────────────────────────────────────────────────────────────

/// Routing result for one order of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderOutcome {
    pub order_id: u32,
    pub result: Result<OrderPath, RoutingError>,
}

/// Per-order results for a whole batch, in input order.
///
/// One bad order never aborts the batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchOutcome {
    pub outcomes: Vec<OrderOutcome>,
}

impl BatchOutcome {
    pub fn routed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.routed()
    }

    pub fn paths(&self) -> impl Iterator<Item = &OrderPath> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (u32, &RoutingError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.order_id, e)))
    }

    /// Readings for the routed orders only.
    pub fn readings(&self) -> Vec<Reading> {
        self.paths().map(Reading::from).collect()
    }
}

/// Route every order independently, in parallel.
pub fn route_batch(orders: &[Order], layout: &Layout, config: &RoutingConfig) -> BatchOutcome {
    let outcomes: Vec<OrderOutcome> = orders
        .par_iter()
        .map(|order| OrderOutcome {
            order_id: order.id,
            result: route(order, layout, config),
        })
        .collect();

    let batch = BatchOutcome { outcomes };
    for (id, err) in batch.failures() {
        log::debug!("Order {} skipped: {}", id, err);
    }
    log::info!(
        "Routed {}/{} orders ({} skipped)",
        batch.routed(),
        orders.len(),
        batch.skipped()
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> Layout {
        Layout::new(10)
            .with_entry(0, 0)
            .with_shelf(3, 3, "X")
            .with_packing(5, 5)
            .with_exit(9, 9)
    }

    fn order(category: &str) -> Order {
        Order::new(1, category, "thing")
    }

    #[test]
    fn test_single_order_distance_and_time() {
        let path = route(&order("X"), &scenario_a(), &RoutingConfig::default()).unwrap();
        assert_eq!(path.total_distance, 18);
        assert_eq!(path.legs.map(|l| l.distance), [6, 4, 8]);
        assert!((path.estimated_time - 12.5).abs() < 1e-12);
        assert_eq!(path.entry, Position::new(0, 0));
        assert_eq!(path.exit, Position::new(9, 9));
    }

    #[test]
    fn test_legs_chain_through_waypoints() {
        let path = route(&order("X"), &scenario_a(), &RoutingConfig::default()).unwrap();
        assert_eq!(path.legs[0].from, path.entry);
        assert_eq!(path.legs[0].to, path.legs[1].from);
        assert_eq!(path.legs[1].to, path.legs[2].from);
        assert_eq!(path.legs[2].to, path.exit);
    }

    #[test]
    fn test_time_model_is_tunable() {
        let config = RoutingConfig {
            picker_speed: 1.0,
            pick_time: 0.0,
            pack_time: 0.0,
            ..RoutingConfig::default()
        };
        let path = route(&order("X"), &scenario_a(), &config).unwrap();
        assert_eq!(path.estimated_time, 18.0);
    }

    #[test]
    fn test_missing_shelf_category() {
        let err = route(&order("Y"), &scenario_a(), &RoutingConfig::default()).unwrap_err();
        assert_eq!(
            err,
            RoutingError::NoMatchingShelf {
                category: "Y".into()
            }
        );
        assert_eq!(err.kind(), ErrorKind::UnroutableOrder);
    }

    #[test]
    fn test_missing_structural_elements() {
        let config = RoutingConfig::default();

        let mut layout = scenario_a();
        layout.entry_points.clear();
        assert_eq!(route(&order("X"), &layout, &config), Err(RoutingError::NoEntryPoint));

        let mut layout = scenario_a();
        layout.packing_stations.clear();
        assert_eq!(route(&order("X"), &layout, &config), Err(RoutingError::NoPackingStation));

        let mut layout = scenario_a();
        layout.exit_points.clear();
        assert_eq!(route(&order("X"), &layout, &config), Err(RoutingError::NoExitPoint));
        assert_eq!(RoutingError::NoExitPoint.kind(), ErrorKind::InvalidLayout);
    }

    #[test]
    fn test_entry_is_checked_before_shelf() {
        let mut layout = scenario_a();
        layout.entry_points.clear();
        let err = route(&order("Y"), &layout, &RoutingConfig::default()).unwrap_err();
        assert_eq!(err, RoutingError::NoEntryPoint);
    }

    #[test]
    fn test_zero_picker_speed_is_rejected() {
        let config = RoutingConfig {
            picker_speed: 0.0,
            ..RoutingConfig::default()
        };
        let err = route(&order("X"), &scenario_a(), &config).unwrap_err();
        assert_eq!(err, RoutingError::Config(ConfigError::NonPositiveSpeed(0.0)));
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);

        let batch = route_batch(&[order("X")], &scenario_a(), &config);
        assert_eq!(batch.skipped(), 1);
        assert!(batch.readings().is_empty());
    }

    #[test]
    fn test_degenerate_grid_fails_fast() {
        let mut layout = scenario_a();
        layout.grid_size = 0;
        let err = route(&order("X"), &layout, &RoutingConfig::default()).unwrap_err();
        assert_eq!(err, RoutingError::Grid(GridError::DegenerateGrid(0)));
        assert_eq!(err.kind(), ErrorKind::DegenerateGrid);
    }

    #[test]
    fn test_element_outside_grid_fails() {
        let mut layout = scenario_a();
        layout.exit_points = vec![Position::new(12, 12)];
        let err = route(&order("X"), &layout, &RoutingConfig::default()).unwrap_err();
        assert!(matches!(err, RoutingError::Grid(GridError::OutOfBounds { .. })));
    }

    #[test]
    fn test_picks_nearest_packing_station() {
        let layout = scenario_a().with_packing(3, 5);
        let path = route(&order("X"), &layout, &RoutingConfig::default()).unwrap();
        assert_eq!(path.packing, Position::new(3, 5));
    }

    #[test]
    fn test_packing_tie_goes_to_first_listed() {
        let layout = Layout::new(10)
            .with_entry(0, 0)
            .with_shelf(2, 8, "X")
            .with_packing(2, 2)
            .with_packing(8, 8)
            .with_exit(9, 9);
        assert_eq!(nearest_packing(&layout, Position::new(2, 8)), Some(Position::new(2, 2)));
    }

    #[test]
    fn test_first_matching_shelf_is_used() {
        let layout = scenario_a().with_shelf(5, 4, "X");
        let path = route(&order("X"), &layout, &RoutingConfig::default()).unwrap();
        assert_eq!(path.shelf, Position::new(3, 3));
    }

    #[test]
    fn test_nearest_policy_picks_closest_endpoints() {
        let layout = Layout::new(10)
            .with_entry(0, 0)
            .with_entry(9, 0)
            .with_shelf(8, 1, "X")
            .with_packing(8, 3)
            .with_exit(0, 9)
            .with_exit(9, 4);

        let first = route(&order("X"), &layout, &RoutingConfig::default()).unwrap();
        assert_eq!(first.entry, Position::new(0, 0));
        assert_eq!(first.exit, Position::new(0, 9));

        let config = RoutingConfig {
            endpoint_policy: EndpointPolicy::Nearest,
            ..RoutingConfig::default()
        };
        let nearest = route(&order("X"), &layout, &config).unwrap();
        assert_eq!(nearest.entry, Position::new(9, 0));
        assert_eq!(nearest.exit, Position::new(9, 4));
        assert!(nearest.total_distance < first.total_distance);
    }

    #[test]
    fn test_endpoint_selectors_handle_empty_lists() {
        let layout = Layout::new(5);
        let p = Position::new(1, 1);
        assert_eq!(select_entry(&layout, p, EndpointPolicy::First), None);
        assert_eq!(select_entry(&layout, p, EndpointPolicy::Nearest), None);
        assert_eq!(select_exit(&layout, p, EndpointPolicy::Nearest), None);
    }

    #[test]
    fn test_trace_walks_every_cell() {
        let path = route(&order("X"), &scenario_a(), &RoutingConfig::default()).unwrap();
        let cells = path.trace(10).unwrap();
        assert_eq!(cells.len() as u32, path.total_distance + 1);
    }

    #[test]
    fn test_batch_keeps_order_and_counts_skips() {
        let orders = vec![
            Order::new(1, "X", "a"),
            Order::new(2, "Y", "b"),
            Order::new(3, "X", "c"),
        ];
        let batch = route_batch(&orders, &scenario_a(), &RoutingConfig::default());
        assert_eq!(batch.outcomes.len(), 3);
        assert_eq!(
            batch.outcomes.iter().map(|o| o.order_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(batch.routed(), 2);
        assert_eq!(batch.skipped(), 1);
        assert_eq!(batch.readings().len(), 2);
        let failures: Vec<_> = batch.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 2);
    }

    #[test]
    fn test_empty_batch() {
        let batch = route_batch(&[], &scenario_a(), &RoutingConfig::default());
        assert_eq!(batch.routed(), 0);
        assert_eq!(batch.skipped(), 0);
    }
}
