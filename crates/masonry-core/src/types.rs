//! Domain types for masonry layouts.
//!
//! Items are supplied by the host each render cycle; the engine only
//! ever refers to them by index. A [`Layout`] is the engine's answer:
//! which item indices go in which column, in top-to-bottom order.

use serde::{Deserialize, Serialize};

/// Position of an item within the current item set (0-based).
pub type ItemIndex = usize;

// ── Items ──────────────────────────────────────────────────────────

/// A single item supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item<C> {
    /// Stable for one render generation.
    pub index: ItemIndex,
    /// Opaque to the engine apart from image discovery.
    pub content: C,
}

impl<C> Item<C> {
    pub fn new(index: ItemIndex, content: C) -> Self {
        Self { index, content }
    }

    /// Wrap a sequence of contents as items numbered in order.
    pub fn from_contents(contents: impl IntoIterator<Item = C>) -> Vec<Self> {
        contents
            .into_iter()
            .enumerate()
            .map(|(index, content)| Self { index, content })
            .collect()
    }
}

// ── Configuration values ───────────────────────────────────────────

/// Column assignment algorithm family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Position-based: each item goes to the column with the fewest items.
    #[default]
    Count,
    /// Height-based: greedy seed plus swap optimization.
    Balanced,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Count => "count",
            Strategy::Balanced => "balanced",
        }
    }
}

/// A viewport width threshold and the column count used at or above it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub min_width: f64,
    pub columns: usize,
}

impl Breakpoint {
    pub fn new(min_width: f64, columns: usize) -> Self {
        Self { min_width, columns }
    }
}

// ── Assignment output ──────────────────────────────────────────────

/// One column of the assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Item indices in insertion order (top to bottom).
    pub items: Vec<ItemIndex>,
    /// Sum of member heights (measured or estimated).
    pub aggregate_height: f64,
}

impl Column {
    pub fn push(&mut self, item: ItemIndex, height: f64) {
        self.items.push(item);
        self.aggregate_height += height;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-item attributes the host stamps on each rendered unit so it can
/// hand the element back to the size observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttributes {
    pub item_index: ItemIndex,
    pub column: usize,
    /// Marks the element as a unit the engine wants measured.
    pub trackable: bool,
}

/// The complete column assignment handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub columns: Vec<Column>,
    pub gap: f64,
    pub smooth_transitions: bool,
    /// Strategy that actually produced this layout (after any fallback).
    pub strategy: Strategy,
}

impl Layout {
    /// An empty layout with `columns` empty columns.
    pub fn empty(columns: usize, gap: f64, strategy: Strategy) -> Self {
        Self {
            columns: vec![Column::default(); columns.max(1)],
            gap,
            smooth_transitions: false,
            strategy,
        }
    }

    /// Total number of assigned items across all columns.
    pub fn item_count(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    /// Item counts per column.
    pub fn column_lengths(&self) -> Vec<usize> {
        self.columns.iter().map(Column::len).collect()
    }

    /// Rendering attributes for every item, ordered by column then position.
    pub fn attributes(&self) -> Vec<ItemAttributes> {
        self.columns
            .iter()
            .enumerate()
            .flat_map(|(column, c)| {
                c.items.iter().map(move |&item_index| ItemAttributes {
                    item_index,
                    column,
                    trackable: true,
                })
            })
            .collect()
    }

    /// Map the assignment back onto the caller's items.
    ///
    /// `items` must be in index order, as supplied to the engine.
    pub fn resolve<'a, C>(&self, items: &'a [Item<C>]) -> Vec<Vec<&'a Item<C>>> {
        self.columns
            .iter()
            .map(|c| c.items.iter().filter_map(|&i| items.get(i)).collect())
            .collect()
    }
}

// ── Scheduler lifecycle ────────────────────────────────────────────

/// Lifecycle of the redistribution scheduler for one item-set generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    #[default]
    Idle,
    Observing,
    PendingRedistribution,
    /// Terminal: observation released.
    Stable,
}

impl SchedulerState {
    pub fn label(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Observing => "observing",
            SchedulerState::PendingRedistribution => "pending",
            SchedulerState::Stable => "stable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_layout() -> Layout {
        Layout {
            columns: vec![
                Column { items: vec![2, 0], aggregate_height: 300.0 },
                Column { items: vec![1], aggregate_height: 250.0 },
            ],
            gap: 16.0,
            smooth_transitions: false,
            strategy: Strategy::Balanced,
        }
    }

    #[test]
    fn strategy_serializes_lowercase() {
        let json = serde_json::to_string(&Strategy::Balanced).unwrap();
        assert_eq!(json, "\"balanced\"");
        let parsed: Strategy = serde_json::from_str("\"count\"").unwrap();
        assert_eq!(parsed, Strategy::Count);
    }

    #[test]
    fn empty_layout_has_at_least_one_column() {
        let layout = Layout::empty(0, 16.0, Strategy::Count);
        assert_eq!(layout.columns.len(), 1);
        assert_eq!(layout.item_count(), 0);
    }

    #[test]
    fn attributes_follow_column_order() {
        let attrs = sample_layout().attributes();
        let indices: Vec<_> = attrs.iter().map(|a| a.item_index).collect();
        assert_eq!(indices, vec![2, 0, 1]);
        assert_eq!(attrs[2].column, 1);
        assert!(attrs.iter().all(|a| a.trackable));
    }

    #[test]
    fn resolve_maps_indices_to_items() {
        let items = Item::from_contents(["a", "b", "c"]);
        let resolved = sample_layout().resolve(&items);
        assert_eq!(resolved[0][0].content, "c");
        assert_eq!(resolved[0][1].content, "a");
        assert_eq!(resolved[1][0].content, "b");
    }
}
