//! Seeded stochastic layout search.
//!
//! Random perturbations scored by [`expected_travel`]. An improving move is
//! always taken; a non-improving one with probability `epsilon`. The best
//! layout seen is returned, so the result is never worse than the input.
//! Same seed, same result.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::{RoutingConfig, SearchConfig};
use crate::grid::{check_grid, occupied_cells, GridError, Layout, Position};
use crate::metrics::expected_travel;
use crate::orders::DemandWeights;

/// Perturbation applied to a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    /// Exchange the categories of two shelves that differ.
    SwapShelves,
    /// Move one shelf to a free cell.
    RelocateShelf,
    /// Move one packing station to a free cell.
    RelocatePacking,
}

const MOVES: [Move; 3] = [Move::SwapShelves, Move::RelocateShelf, Move::RelocatePacking];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub layout: Layout,
    /// `None` when the input layout cannot route anything.
    pub initial_cost: Option<f64>,
    pub best_cost: Option<f64>,
    /// Moves accepted, improving or exploratory.
    pub accepted: u32,
    /// Times a new best was found.
    pub improvements: u32,
}

fn cost(layout: &Layout, weights: &DemandWeights, routing: &RoutingConfig) -> f64 {
    expected_travel(layout, weights, routing).unwrap_or(f64::INFINITY)
}

fn finite(cost: f64) -> Option<f64> {
    cost.is_finite().then_some(cost)
}

fn free_cells(layout: &Layout) -> Vec<Position> {
    let taken = occupied_cells(layout);
    let n = layout.grid_size;
    (0..n)
        .flat_map(|r| (0..n).map(move |c| Position::new(r, c)))
        .filter(|p| !taken.contains(p))
        .collect()
}

/// Apply `mv` to a copy of `layout`; `None` if the move has nothing to act on.
fn perturb(layout: &Layout, mv: Move, rng: &mut impl Rng) -> Option<Layout> {
    let mut next = layout.clone();
    match mv {
        Move::SwapShelves => {
            let i = rng.gen_range(0..next.shelves.len().max(1));
            let first = next.shelves.get(i)?.category.clone();
            let others: Vec<usize> = (0..next.shelves.len())
                .filter(|&j| next.shelves[j].category != first)
                .collect();
            let &j = others.choose(rng)?;
            let second = std::mem::replace(&mut next.shelves[j].category, first);
            next.shelves[i].category = second;
        }
        Move::RelocateShelf => {
            let free = free_cells(&next);
            let i = rng.gen_range(0..next.shelves.len().max(1));
            let shelf = next.shelves.get_mut(i)?;
            shelf.position = *free.choose(rng)?;
        }
        Move::RelocatePacking => {
            let free = free_cells(&next);
            let i = rng.gen_range(0..next.packing_stations.len().max(1));
            let station = next.packing_stations.get_mut(i)?;
            *station = *free.choose(rng)?;
        }
    }
    Some(next)
}

/// Run the search from `start`.
///
/// ```
/// use aislesim_logic::config::{RoutingConfig, SearchConfig};
/// use aislesim_logic::grid::Layout;
/// use aislesim_logic::orders::DemandWeights;
/// use aislesim_logic::search::search_layout;
///
/// let layout = Layout::new(8)
///     .with_entry(0, 0)
///     .with_shelf(7, 7, "X")
///     .with_packing(7, 0)
///     .with_exit(0, 7);
/// let config = SearchConfig { iterations: 50, ..SearchConfig::default() };
/// let outcome =
///     search_layout(&layout, &DemandWeights::new(), &RoutingConfig::default(), &config).unwrap();
/// assert!(outcome.best_cost <= outcome.initial_cost);
/// ```
pub fn search_layout(
    start: &Layout,
    weights: &DemandWeights,
    routing: &RoutingConfig,
    config: &SearchConfig,
) -> Result<SearchOutcome, GridError> {
    check_grid(start.grid_size)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let initial = cost(start, weights, routing);

    let mut current = start.clone();
    let mut current_cost = initial;
    let mut best = start.clone();
    let mut best_cost = initial;
    let mut accepted = 0;
    let mut improvements = 0;

    for iteration in 0..config.iterations {
        let Some(&mv) = MOVES.choose(&mut rng) else {
            break;
        };
        let Some(candidate) = perturb(&current, mv, &mut rng) else {
            continue;
        };
        let candidate_cost = cost(&candidate, weights, routing);
        let explore = rng.gen::<f64>() < config.epsilon;
        if candidate_cost < current_cost || explore {
            current = candidate;
            current_cost = candidate_cost;
            accepted += 1;
        }
        if current_cost < best_cost {
            best = current.clone();
            best_cost = current_cost;
            improvements += 1;
            log::debug!(
                "Search iteration {}: {:?} improved expected travel to {:.2}",
                iteration,
                mv,
                best_cost
            );
        }
    }

    log::info!(
        "Search (seed {}, {} iterations): expected travel {:.2} -> {:.2}",
        config.seed,
        config.iterations,
        initial,
        best_cost
    );

    Ok(SearchOutcome {
        layout: best,
        initial_cost: finite(initial),
        best_cost: finite(best_cost),
        accepted,
        improvements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use crate::optimizer::optimize_layout;
    use std::collections::BTreeMap;

    fn far_flung() -> Layout {
        Layout::new(10)
            .with_entry(0, 0)
            .with_exit(0, 9)
            .with_packing(9, 9)
            .with_shelf(9, 0, "A")
            .with_shelf(8, 0, "A")
            .with_shelf(9, 5, "B")
            .with_shelf(5, 5, "C")
    }

    fn weights() -> DemandWeights {
        DemandWeights::from_pairs([("A", 5.0), ("B", 2.0), ("C", 1.0)])
    }

    fn counts(layout: &Layout) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for s in &layout.shelves {
            *counts.entry(s.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_same_seed_same_result() {
        let config = SearchConfig {
            iterations: 200,
            ..SearchConfig::default()
        };
        let routing = RoutingConfig::default();
        let a = search_layout(&far_flung(), &weights(), &routing, &config).unwrap();
        let b = search_layout(&far_flung(), &weights(), &routing, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_never_worse_than_input() {
        let routing = RoutingConfig::default();
        for seed in 0..5 {
            let config = SearchConfig {
                seed,
                iterations: 100,
                epsilon: 0.5,
            };
            let out = search_layout(&far_flung(), &weights(), &routing, &config).unwrap();
            let before = out.initial_cost.unwrap();
            let after = out.best_cost.unwrap();
            assert!(after <= before, "seed {seed}: {after} > {before}");
            let recomputed = expected_travel(&out.layout, &weights(), &routing).unwrap();
            assert!((recomputed - after).abs() < 1e-9);
        }
    }

    #[test]
    fn test_finds_improvement_on_poor_layout() {
        let config = SearchConfig {
            iterations: 300,
            ..SearchConfig::default()
        };
        let out =
            search_layout(&far_flung(), &weights(), &RoutingConfig::default(), &config).unwrap();
        assert!(out.best_cost.unwrap() < out.initial_cost.unwrap());
        assert!(out.improvements > 0);
    }

    #[test]
    fn test_keeps_counts_and_exclusivity() {
        let config = SearchConfig {
            iterations: 300,
            epsilon: 0.3,
            ..SearchConfig::default()
        };
        let start = far_flung();
        let out = search_layout(&start, &weights(), &RoutingConfig::default(), &config).unwrap();
        assert_eq!(counts(&start), counts(&out.layout));
        assert_eq!(occupied_cells(&out.layout).len(), out.layout.element_count());
    }

    #[test]
    fn test_refines_optimizer_output() {
        let optimized =
            optimize_layout(&far_flung(), &weights(), &OptimizerConfig::default()).unwrap();
        let routing = RoutingConfig::default();
        let out =
            search_layout(&optimized, &weights(), &routing, &SearchConfig::default()).unwrap();
        assert!(out.best_cost.unwrap() <= out.initial_cost.unwrap());
    }

    #[test]
    fn test_unroutable_layout_is_returned_unchanged_cost() {
        let layout = Layout::new(4).with_shelf(1, 1, "X");
        let out = search_layout(
            &layout,
            &DemandWeights::new(),
            &RoutingConfig::default(),
            &SearchConfig::default(),
        )
        .unwrap();
        assert_eq!(out.initial_cost, None);
        assert_eq!(out.best_cost, None);
        assert_eq!(out.layout, layout);
    }

    #[test]
    fn test_degenerate_grid() {
        let out = search_layout(
            &Layout::new(-3),
            &DemandWeights::new(),
            &RoutingConfig::default(),
            &SearchConfig::default(),
        );
        assert_eq!(out, Err(GridError::DegenerateGrid(-3)));
    }

    #[test]
    fn test_swap_needs_two_categories() {
        let layout = Layout::new(5).with_shelf(0, 1, "X").with_shelf(0, 2, "X");
        let mut rng = StdRng::seed_from_u64(42);
        assert!(perturb(&layout, Move::SwapShelves, &mut rng).is_none());
        assert!(perturb(&layout, Move::RelocatePacking, &mut rng).is_none());
        let moved = perturb(&layout, Move::RelocateShelf, &mut rng).unwrap();
        assert_eq!(moved.shelves.len(), 2);
    }
}
