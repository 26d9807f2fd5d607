//! Warehouse grid model.
//!
//! A [`Layout`] is a square grid with shelves, packing stations, entry and
//! exit points and charging stations placed on it. The grid has no walls:
//! every in-bounds cell is walkable, placed elements included. This module
//! answers "what is on this cell" and "is this cell taken", nothing more.
//!
//! ```
//! use aislesim_logic::grid::{cell_type, CellType, Layout, Position};
//!
//! let layout = Layout::new(10)
//!     .with_entry(0, 0)
//!     .with_shelf(3, 3, "X")
//!     .with_packing(5, 5)
//!     .with_exit(9, 9);
//! assert_eq!(cell_type(&layout, Position::new(3, 3)), CellType::Shelf);
//! assert_eq!(cell_type(&layout, Position::new(4, 4)), CellType::None);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A grid cell, `(row, col)`, 0-indexed.
///
/// Signed so that malformed negative input is caught by bounds checks
/// instead of wrapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to `other`.
    pub fn manhattan(self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The four orthogonal neighbours (up, down, left, right), unchecked.
    pub fn neighbors(self) -> [Position; 4] {
        [
            Position::new(self.row - 1, self.col),
            Position::new(self.row + 1, self.col),
            Position::new(self.row, self.col - 1),
            Position::new(self.row, self.col + 1),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A shelf holding one product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shelf {
    #[serde(flatten)]
    pub position: Position,
    pub category: String,
}

impl Shelf {
    pub fn new(row: i32, col: i32, category: impl Into<String>) -> Self {
        Self {
            position: Position::new(row, col),
            category: category.into(),
        }
    }
}

/// Static arrangement of a warehouse floor.
///
/// Produced by the layout editor and handed to the core by value. Missing
/// lists deserialize as empty; routing reports which one is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Side length of the square grid.
    pub grid_size: i32,
    #[serde(default)]
    pub shelves: Vec<Shelf>,
    #[serde(default)]
    pub packing_stations: Vec<Position>,
    #[serde(default)]
    pub entry_points: Vec<Position>,
    #[serde(default)]
    pub exit_points: Vec<Position>,
    #[serde(default)]
    pub charging_stations: Vec<Position>,
}

impl Layout {
    /// An empty `grid_size × grid_size` floor.
    pub fn new(grid_size: i32) -> Self {
        Self {
            grid_size,
            shelves: Vec::new(),
            packing_stations: Vec::new(),
            entry_points: Vec::new(),
            exit_points: Vec::new(),
            charging_stations: Vec::new(),
        }
    }

    pub fn with_shelf(mut self, row: i32, col: i32, category: impl Into<String>) -> Self {
        self.shelves.push(Shelf::new(row, col, category));
        self
    }

    pub fn with_packing(mut self, row: i32, col: i32) -> Self {
        self.packing_stations.push(Position::new(row, col));
        self
    }

    pub fn with_entry(mut self, row: i32, col: i32) -> Self {
        self.entry_points.push(Position::new(row, col));
        self
    }

    pub fn with_exit(mut self, row: i32, col: i32) -> Self {
        self.exit_points.push(Position::new(row, col));
        self
    }

    pub fn with_charging(mut self, row: i32, col: i32) -> Self {
        self.charging_stations.push(Position::new(row, col));
        self
    }

    /// Total number of placed elements of every type.
    pub fn element_count(&self) -> usize {
        self.shelves.len()
            + self.packing_stations.len()
            + self.entry_points.len()
            + self.exit_points.len()
            + self.charging_stations.len()
    }

    /// Every placed element with its type, in priority order
    /// (shelves first, charging stations last).
    pub fn elements(&self) -> impl Iterator<Item = (CellType, Position)> + '_ {
        let shelves = self.shelves.iter().map(|s| (CellType::Shelf, s.position));
        let packing = self
            .packing_stations
            .iter()
            .map(|&p| (CellType::Packing, p));
        let entries = self.entry_points.iter().map(|&p| (CellType::Entry, p));
        let exits = self.exit_points.iter().map(|&p| (CellType::Exit, p));
        let charging = self
            .charging_stations
            .iter()
            .map(|&p| (CellType::Charging, p));
        shelves
            .chain(packing)
            .chain(entries)
            .chain(exits)
            .chain(charging)
    }
}

/// What occupies a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Shelf,
    Packing,
    Entry,
    Exit,
    Charging,
    None,
}

impl CellType {
    pub fn label(self) -> &'static str {
        match self {
            CellType::Shelf => "shelf",
            CellType::Packing => "packing station",
            CellType::Entry => "entry point",
            CellType::Exit => "exit point",
            CellType::Charging => "charging station",
            CellType::None => "empty",
        }
    }
}

/// Grid-level failure: the grid itself or a coordinate on it is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// Grid size is zero or negative.
    DegenerateGrid(i32),
    /// A coordinate lies outside `[0, grid_size)`.
    OutOfBounds { position: Position, grid_size: i32 },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::DegenerateGrid(size) => write!(f, "degenerate grid size {}", size),
            GridError::OutOfBounds {
                position,
                grid_size,
            } => write!(
                f,
                "position {} is outside the {}x{} grid",
                position, grid_size, grid_size
            ),
        }
    }
}

impl std::error::Error for GridError {}

/// Fails with [`GridError::DegenerateGrid`] unless `grid_size > 0`.
pub fn check_grid(grid_size: i32) -> Result<(), GridError> {
    if grid_size <= 0 {
        return Err(GridError::DegenerateGrid(grid_size));
    }
    Ok(())
}

pub fn in_bounds(grid_size: i32, pos: Position) -> bool {
    (0..grid_size).contains(&pos.row) && (0..grid_size).contains(&pos.col)
}

/// Fails if the grid is degenerate or `pos` is outside it. No clamping.
pub fn check_bounds(grid_size: i32, pos: Position) -> Result<(), GridError> {
    check_grid(grid_size)?;
    if !in_bounds(grid_size, pos) {
        return Err(GridError::OutOfBounds {
            position: pos,
            grid_size,
        });
    }
    Ok(())
}

/// Classify a cell. First match wins: shelf > packing > entry > exit > charging.
///
/// The order only matters for malformed layouts that stack different element
/// types on one cell.
pub fn cell_type(layout: &Layout, pos: Position) -> CellType {
    layout
        .elements()
        .find(|&(_, p)| p == pos)
        .map_or(CellType::None, |(kind, _)| kind)
}

/// Every in-bounds cell is walkable; there are no obstacle cells.
pub fn is_walkable(layout: &Layout, pos: Position) -> bool {
    in_bounds(layout.grid_size, pos)
}

/// True if any element sits on `pos`.
pub fn is_occupied(layout: &Layout, pos: Position) -> bool {
    layout.elements().any(|(_, p)| p == pos)
}

/// The set of cells holding at least one element.
pub fn occupied_cells(layout: &Layout) -> HashSet<Position> {
    layout.elements().map(|(_, p)| p).collect()
}

/// Distinct shelf categories in first-appearance order.
pub fn categories(layout: &Layout) -> Vec<&str> {
    let mut seen = HashSet::new();
    layout
        .shelves
        .iter()
        .map(|s| s.category.as_str())
        .filter(|c| seen.insert(*c))
        .collect()
}

/// Shelves stocking `category`, in layout order.
pub fn shelves_in<'a>(layout: &'a Layout, category: &'a str) -> impl Iterator<Item = &'a Shelf> {
    layout.shelves.iter().filter(move |s| s.category == category)
}
