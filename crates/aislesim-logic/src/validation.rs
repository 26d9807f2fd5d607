//! Structural validation for warehouse layouts.
//!
//! Pure functions that take a layout and return findings. Error-severity
//! findings make a layout unusable; warnings flag layouts that load but
//! will route poorly or not at all.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::grid::{in_bounds, CellType, Layout, Position};

/// A layout validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub category: &'static str,
    pub severity: Severity,
    pub message: String,
}

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl ValidationError {
    fn error(category: &'static str, message: String) -> Self {
        Self {
            category,
            severity: Severity::Error,
            message,
        }
    }

    fn warning(category: &'static str, message: String) -> Self {
        Self {
            category,
            severity: Severity::Warning,
            message,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{}] {}: {}", level, self.category, self.message)
    }
}

// ── Checks ──────────────────────────────────────────────────────────────

pub fn check_grid_size(layout: &Layout) -> Vec<ValidationError> {
    if layout.grid_size > 0 {
        return Vec::new();
    }
    vec![ValidationError::error(
        "grid",
        format!("Grid size must be positive, got {}", layout.grid_size),
    )]
}

/// Every element must lie inside the grid. Skipped for a degenerate grid,
/// which `check_grid_size` already reports.
pub fn check_bounds(layout: &Layout) -> Vec<ValidationError> {
    if layout.grid_size <= 0 {
        return Vec::new();
    }
    layout
        .elements()
        .filter(|(_, pos)| !in_bounds(layout.grid_size, *pos))
        .map(|(kind, pos)| {
            ValidationError::error(
                "bounds",
                format!(
                    "{} at {} lies outside the {}×{} grid",
                    kind.label(),
                    pos,
                    layout.grid_size,
                    layout.grid_size
                ),
            )
        })
        .collect()
}

pub fn check_categories(layout: &Layout) -> Vec<ValidationError> {
    layout
        .shelves
        .iter()
        .filter(|s| s.category.trim().is_empty())
        .map(|s| {
            ValidationError::error(
                "category",
                format!("Shelf at {} has an empty category", s.position),
            )
        })
        .collect()
}

/// Different element types on one cell is an error; the same type listed
/// twice is a warning.
pub fn check_overlaps(layout: &Layout) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashMap<Position, CellType> = HashMap::new();

    for (kind, pos) in layout.elements() {
        match seen.get(&pos) {
            None => {
                seen.insert(pos, kind);
            }
            Some(&first) if first == kind => errors.push(ValidationError::warning(
                "overlap",
                format!("Duplicate {} at {}", kind.label(), pos),
            )),
            Some(&first) => errors.push(ValidationError::error(
                "overlap",
                format!("{} and {} share cell {}", first.label(), kind.label(), pos),
            )),
        }
    }
    errors
}

/// Missing structural lists make every order fail to route.
pub fn check_structure(layout: &Layout) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (missing, name) in [
        (layout.entry_points.is_empty(), "entry point"),
        (layout.exit_points.is_empty(), "exit point"),
        (layout.packing_stations.is_empty(), "packing station"),
    ] {
        if missing {
            errors.push(ValidationError::warning(
                "structure",
                format!("Layout has no {}; no order can be routed", name),
            ));
        }
    }
    errors
}

/// Run every check.
pub fn validate_layout(layout: &Layout) -> Vec<ValidationError> {
    let mut all = Vec::new();
    all.extend(check_grid_size(layout));
    all.extend(check_bounds(layout));
    all.extend(check_categories(layout));
    all.extend(check_overlaps(layout));
    all.extend(check_structure(layout));
    all
}

// ── Boundary parsing ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum LayoutError {
    Parse(serde_json::Error),
    /// The error-severity findings that rejected the layout.
    Invalid(Vec<ValidationError>),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Parse(e) => write!(f, "layout JSON error: {}", e),
            LayoutError::Invalid(findings) => {
                write!(f, "invalid layout ({} errors)", findings.len())?;
                if let Some(first) = findings.first() {
                    write!(f, ": {}", first.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayoutError::Parse(e) => Some(e),
            LayoutError::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(e: serde_json::Error) -> Self {
        LayoutError::Parse(e)
    }
}

impl Layout {
    /// Parse a layout and reject it if it has any error-severity finding.
    /// Warnings are logged and the layout is returned.
    pub fn from_json(text: &str) -> Result<Layout, LayoutError> {
        let layout: Layout = serde_json::from_str(text)?;
        let (errors, warnings): (Vec<_>, Vec<_>) =
            validate_layout(&layout).into_iter().partition(|f| f.is_error());
        for w in &warnings {
            log::warn!("{}", w);
        }
        if !errors.is_empty() {
            return Err(LayoutError::Invalid(errors));
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn good() -> Layout {
        Layout::new(10)
            .with_entry(0, 0)
            .with_shelf(3, 3, "X")
            .with_shelf(3, 4, "Y")
            .with_packing(5, 5)
            .with_exit(9, 9)
            .with_charging(0, 9)
    }

    #[test]
    fn test_valid_layout_no_findings() {
        assert!(validate_layout(&good()).is_empty());
    }

    #[test]
    fn test_non_positive_grid() {
        let mut layout = good();
        layout.grid_size = 0;
        let findings = validate_layout(&layout);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "grid");
        assert!(findings[0].is_error());
    }

    #[test]
    fn test_out_of_bounds_element() {
        let layout = good().with_packing(10, 2).with_shelf(-1, 0, "Z");
        let findings = check_bounds(&layout);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.category == "bounds" && f.is_error()));
    }

    #[test]
    fn test_empty_category() {
        let layout = good().with_shelf(7, 7, "  ");
        let findings = check_categories(&layout);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("(7, 7)"));
    }

    #[test]
    fn test_different_types_on_one_cell() {
        let layout = good().with_packing(3, 3);
        let findings = check_overlaps(&layout);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
    }

    #[test]
    fn test_same_type_duplicate_is_warning() {
        let layout = good().with_exit(9, 9);
        let findings = check_overlaps(&layout);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_missing_structure_warnings() {
        let layout = Layout::new(5).with_shelf(1, 1, "X");
        let findings = check_structure(&layout);
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.severity == Severity::Warning));
    }

    #[test]
    fn test_from_json_accepts_valid() {
        let text = r#"{
            "gridSize": 10,
            "shelves": [{"row": 3, "col": 3, "category": "X"}],
            "packingStations": [{"row": 5, "col": 5}],
            "entryPoints": [{"row": 0, "col": 0}],
            "exitPoints": [{"row": 9, "col": 9}]
        }"#;
        let layout = Layout::from_json(text).unwrap();
        assert_eq!(layout.shelves.len(), 1);
        assert!(layout.charging_stations.is_empty());
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let text = r#"{"gridSize": 4, "shelves": [{"row": 9, "col": 0, "category": "X"}]}"#;
        match Layout::from_json(text) {
            Err(LayoutError::Invalid(findings)) => {
                assert_eq!(findings.len(), 1);
                assert_eq!(findings[0].category, "bounds");
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_parse_error() {
        assert!(matches!(
            Layout::from_json("{not json"),
            Err(LayoutError::Parse(_))
        ));
    }
}
