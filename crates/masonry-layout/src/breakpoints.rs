//! Viewport breakpoint resolution.
//!
//! A breakpoint table maps minimum viewport widths to column counts.
//! The widest threshold that the viewport reaches wins; below every
//! threshold the configured default applies.

use masonry_core::Breakpoint;
use tracing::debug;

/// Resolve the effective column count for `width`.
///
/// Thresholds are inclusive lower bounds. Never returns zero.
pub fn resolve_columns(width: f64, default: usize, breakpoints: &[Breakpoint]) -> usize {
    let mut sorted: Vec<&Breakpoint> = breakpoints.iter().collect();
    sorted.sort_by(|a, b| b.min_width.total_cmp(&a.min_width));

    sorted
        .into_iter()
        .find(|bp| bp.min_width <= width)
        .map(|bp| bp.columns)
        .unwrap_or(default)
        .max(1)
}

/// Remembers the last resolution so callers can tell when column
/// membership semantics changed.
#[derive(Debug, Clone)]
pub struct ColumnResolver {
    default: usize,
    breakpoints: Vec<Breakpoint>,
    current: Option<usize>,
}

impl ColumnResolver {
    pub fn new(default: usize, breakpoints: Vec<Breakpoint>) -> Self {
        Self {
            default,
            breakpoints,
            current: None,
        }
    }

    /// Resolve `width` and report whether the count differs from the
    /// previous resolution. The first resolution always reports a change.
    pub fn update(&mut self, width: f64) -> (usize, bool) {
        let columns = resolve_columns(width, self.default, &self.breakpoints);
        let changed = self.current != Some(columns);
        if changed {
            debug!(width, previous = ?self.current, columns, "column count changed");
        }
        self.current = Some(columns);
        (columns, changed)
    }

    /// Replace the table, keeping the last resolution for change detection.
    pub fn reconfigure(&mut self, default: usize, breakpoints: Vec<Breakpoint>) {
        self.default = default;
        self.breakpoints = breakpoints;
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }
}
