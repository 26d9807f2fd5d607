//! Shortest paths on the warehouse grid.
//!
//! Two contracts:
//! - [`shortest_distance`]: closed-form Manhattan distance. The floor has no
//!   obstacles, so this is always the true path length.
//! - [`shortest_path`]: explicit A* search returning the cells walked, for
//!   consumers that need to draw the route.
//!
//! Moves are 4-directional with unit cost; the Manhattan heuristic is
//! admissible and consistent, so the first time the goal is popped the path
//! is shortest.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::grid::{check_bounds, in_bounds, GridError, Position};

/// Manhattan distance between two cells.
pub fn shortest_distance(a: Position, b: Position) -> u32 {
    a.manhattan(b)
}

/// Shortest path on an open `grid_size × grid_size` grid.
///
/// Returns every cell from `start` to `goal` inclusive; `start == goal`
/// yields a single-cell path. Both ends must be inside the grid.
///
/// ```
/// use aislesim_logic::grid::Position;
/// use aislesim_logic::pathfinding::{shortest_distance, shortest_path};
///
/// let (a, b) = (Position::new(0, 0), Position::new(3, 3));
/// let path = shortest_path(a, b, 10).unwrap();
/// assert_eq!(path.len() as u32 - 1, shortest_distance(a, b));
/// ```
pub fn shortest_path(
    start: Position,
    goal: Position,
    grid_size: i32,
) -> Result<Vec<Position>, GridError> {
    find_path_with(start, goal, grid_size, |_| true)
}

/// A* with a caller-supplied walkability test.
///
/// `start` and `goal` are always enterable. Returns an empty path when the
/// goal cannot be reached. Visits at most `grid_size²` cells.
pub fn find_path_with<F>(
    start: Position,
    goal: Position,
    grid_size: i32,
    walkable: F,
) -> Result<Vec<Position>, GridError>
where
    F: Fn(Position) -> bool,
{
    check_bounds(grid_size, start)?;
    check_bounds(grid_size, goal)?;

    if start == goal {
        return Ok(vec![start]);
    }

    // Ties on f are broken by the cell's (row, col) ordering, so the
    // result is stable for a fixed grid.
    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut cost_so_far: HashMap<Position, u32> = HashMap::new();
    let mut closed: HashSet<Position> = HashSet::new();

    frontier.push(Reverse((shortest_distance(start, goal), start)));
    cost_so_far.insert(start, 0);

    while let Some(Reverse((_, current))) = frontier.pop() {
        if current == goal {
            return Ok(reconstruct(&came_from, current));
        }
        if !closed.insert(current) {
            continue;
        }

        let current_cost = cost_so_far.get(&current).copied().unwrap_or(u32::MAX);
        for next in current.neighbors() {
            if !in_bounds(grid_size, next) || closed.contains(&next) {
                continue;
            }
            if next != goal && !walkable(next) {
                continue;
            }
            let new_cost = current_cost.saturating_add(1);
            let better = cost_so_far.get(&next).map_or(true, |&old| new_cost < old);
            if better {
                cost_so_far.insert(next, new_cost);
                came_from.insert(next, current);
                frontier.push(Reverse((new_cost + shortest_distance(next, goal), next)));
            }
        }
    }

    Ok(Vec::new())
}

fn reconstruct(came_from: &HashMap<Position, Position>, end: Position) -> Vec<Position> {
    let mut path = vec![end];
    let mut node = end;
    while let Some(&prev) = came_from.get(&node) {
        path.push(prev);
        node = prev;
    }
    path.reverse();
    path
}

/// Concatenate shortest paths through a list of waypoints into one walk.
///
/// Shared waypoints appear once. A single waypoint yields itself; an empty
/// list yields an empty walk.
pub fn trace_route(waypoints: &[Position], grid_size: i32) -> Result<Vec<Position>, GridError> {
    let mut walk: Vec<Position> = Vec::new();
    if let Some(&first) = waypoints.first() {
        check_bounds(grid_size, first)?;
        walk.push(first);
    }
    for pair in waypoints.windows(2) {
        let leg = shortest_path(pair[0], pair[1], grid_size)?;
        walk.extend(leg.into_iter().skip(1));
    }
    Ok(walk)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contiguous(path: &[Position]) {
        for step in path.windows(2) {
            assert_eq!(
                shortest_distance(step[0], step[1]),
                1,
                "non-adjacent step {} -> {}",
                step[0],
                step[1]
            );
        }
    }

    #[test]
    fn test_same_cell() {
        let p = Position::new(4, 4);
        assert_eq!(shortest_path(p, p, 10).unwrap(), vec![p]);
        assert_eq!(shortest_distance(p, p), 0);
    }

    #[test]
    fn test_adjacent_cells() {
        let a = Position::new(0, 0);
        let b = Position::new(0, 1);
        assert_eq!(shortest_path(a, b, 3).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_length_matches_manhattan_everywhere() {
        let size = 6;
        for r1 in 0..size {
            for c1 in 0..size {
                for (r2, c2) in [(0, 0), (5, 5), (2, 4), (5, 0)] {
                    let a = Position::new(r1, c1);
                    let b = Position::new(r2, c2);
                    let path = shortest_path(a, b, size).unwrap();
                    assert_eq!(path.len() as u32 - 1, shortest_distance(a, b));
                    assert_eq!(path.first(), Some(&a));
                    assert_eq!(path.last(), Some(&b));
                    assert_contiguous(&path);
                }
            }
        }
    }

    #[test]
    fn test_reverse_direction_same_length() {
        let a = Position::new(1, 7);
        let b = Position::new(8, 2);
        let forward = shortest_path(a, b, 10).unwrap();
        let back = shortest_path(b, a, 10).unwrap();
        assert_eq!(forward.len(), back.len());
    }

    #[test]
    fn test_deterministic() {
        let a = Position::new(0, 0);
        let b = Position::new(7, 5);
        assert_eq!(shortest_path(a, b, 8).unwrap(), shortest_path(a, b, 8).unwrap());
    }

    #[test]
    fn test_detours_around_blocked_cells() {
        // Column 2 is blocked except at row 4.
        let wall = |p: Position| !(p.col == 2 && p.row != 4);
        let a = Position::new(0, 0);
        let b = Position::new(0, 4);
        let path = find_path_with(a, b, 5, wall).unwrap();
        assert!(path.contains(&Position::new(4, 2)));
        assert_eq!(path.len(), 1 + 4 + 4 + 4);
        assert_contiguous(&path);
    }

    #[test]
    fn test_unreachable_goal_yields_empty_path() {
        let wall = |p: Position| p.col != 2;
        let path = find_path_with(Position::new(0, 0), Position::new(0, 4), 5, wall).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_out_of_bounds_fails_fast() {
        let err = shortest_path(Position::new(0, 0), Position::new(10, 0), 10).unwrap_err();
        assert_eq!(
            err,
            GridError::OutOfBounds {
                position: Position::new(10, 0),
                grid_size: 10
            }
        );
        assert!(shortest_path(Position::new(-1, 0), Position::new(0, 0), 10).is_err());
    }

    #[test]
    fn test_degenerate_grid() {
        let err = shortest_path(Position::new(0, 0), Position::new(0, 0), 0).unwrap_err();
        assert_eq!(err, GridError::DegenerateGrid(0));
    }

    #[test]
    fn test_trace_route_joins_legs() {
        let stops = [
            Position::new(0, 0),
            Position::new(3, 3),
            Position::new(5, 5),
            Position::new(9, 9),
        ];
        let walk = trace_route(&stops, 10).unwrap();
        assert_eq!(walk.len(), 18 + 1);
        assert_eq!(walk.first(), Some(&stops[0]));
        assert_eq!(walk.last(), Some(&stops[3]));
        assert_contiguous(&walk);
    }

    #[test]
    fn test_trace_route_edge_cases() {
        assert!(trace_route(&[], 5).unwrap().is_empty());
        let p = Position::new(2, 2);
        assert_eq!(trace_route(&[p], 5).unwrap(), vec![p]);
        assert!(trace_route(&[Position::new(7, 7)], 5).is_err());
    }
}
