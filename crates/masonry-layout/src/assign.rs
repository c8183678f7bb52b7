//! Item → column assignment.
//!
//! Two strategies:
//!
//! - **count** — each item goes to the column with the fewest items so
//!   far (ties to the lowest column index). Ignores heights.
//! - **balanced** — Longest-Processing-Time-First greedy seed (tallest
//!   item to the currently shortest column), followed by a bounded
//!   optimization pass that swaps items between the tallest and the
//!   shortest column while that strictly reduces the height spread.
//!
//! Spread is measured as `(max - min) / max` over column heights.

use masonry_core::{Column, ItemIndex, Strategy};
use serde::Serialize;
use tracing::debug;

/// Swap iterations allowed in the optimization pass.
pub const MAX_OPTIMIZATION_ITERATIONS: usize = 10;

/// Diagnostics from one assignment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssignmentStats {
    /// Swaps accepted by the optimization pass.
    pub swaps: usize,
    /// Optimization iterations entered.
    pub iterations: usize,
    /// Final `(max - min) / max` spread.
    pub variance: f64,
}

/// Columns plus how they were reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub columns: Vec<Column>,
    pub stats: AssignmentStats,
}

/// Run `strategy` over `heights` (one entry per item, in index order).
pub fn assign(strategy: Strategy, heights: &[f64], columns: usize, threshold: f64) -> Assignment {
    match strategy {
        Strategy::Count => {
            let columns = distribute_by_count(heights, columns);
            let variance = variance(&columns);
            Assignment {
                columns,
                stats: AssignmentStats {
                    variance,
                    ..AssignmentStats::default()
                },
            }
        }
        Strategy::Balanced => assign_balanced(heights, columns, threshold),
    }
}

/// Round-robin by running count. Aggregate heights are all zero.
pub fn assign_count(item_count: usize, columns: usize) -> Vec<Column> {
    distribute_by_count(&vec![0.0; item_count], columns)
}

/// Height-balanced assignment.
///
/// When no item has a positive height yet there is nothing to balance
/// on, and the count distribution is returned instead.
pub fn assign_balanced(heights: &[f64], columns: usize, threshold: f64) -> Assignment {
    let k = columns.max(1);

    if heights.iter().all(|h| *h <= 0.0) {
        debug!(items = heights.len(), columns = k, "no heights known, seeding by count");
        let columns = distribute_by_count(heights, k);
        let variance = variance(&columns);
        return Assignment {
            columns,
            stats: AssignmentStats {
                variance,
                ..AssignmentStats::default()
            },
        };
    }

    // Tallest first; equal heights keep index order.
    let mut order: Vec<ItemIndex> = (0..heights.len()).collect();
    order.sort_by(|&a, &b| heights[b].total_cmp(&heights[a]).then(a.cmp(&b)));

    let mut cols = vec![Column::default(); k];
    for item in order {
        let target = shortest(&cols);
        cols[target].push(item, heights[item]);
    }

    let stats = optimize(&mut cols, heights, threshold);
    debug!(
        items = heights.len(),
        columns = k,
        swaps = stats.swaps,
        variance = stats.variance,
        "balanced assignment"
    );

    Assignment {
        columns: cols,
        stats,
    }
}

/// `(max - min) / max` over column heights; zero when every column is empty.
pub fn variance(columns: &[Column]) -> f64 {
    spread(columns.iter().map(|c| c.aggregate_height))
}

fn spread(heights: impl Iterator<Item = f64>) -> f64 {
    let (min, max) = heights.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), h| {
        (lo.min(h), hi.max(h))
    });
    if !max.is_finite() || max <= 0.0 {
        return 0.0;
    }
    (max - min) / max
}

fn distribute_by_count(heights: &[f64], columns: usize) -> Vec<Column> {
    let mut cols = vec![Column::default(); columns.max(1)];
    for (item, &height) in heights.iter().enumerate() {
        let mut target = 0;
        for (i, col) in cols.iter().enumerate().skip(1) {
            if col.len() < cols[target].len() {
                target = i;
            }
        }
        cols[target].push(item, height);
    }
    cols
}

/// Lowest column index among the shortest columns.
fn shortest(cols: &[Column]) -> usize {
    let mut best = 0;
    for (i, col) in cols.iter().enumerate().skip(1) {
        if col.aggregate_height < cols[best].aggregate_height {
            best = i;
        }
    }
    best
}

/// Lowest column index among the tallest columns.
fn tallest(cols: &[Column]) -> usize {
    let mut best = 0;
    for (i, col) in cols.iter().enumerate().skip(1) {
        if col.aggregate_height > cols[best].aggregate_height {
            best = i;
        }
    }
    best
}

fn optimize(cols: &mut [Column], heights: &[f64], threshold: f64) -> AssignmentStats {
    let mut stats = AssignmentStats {
        variance: variance(cols),
        ..AssignmentStats::default()
    };

    while stats.variance > threshold && stats.iterations < MAX_OPTIMIZATION_ITERATIONS {
        stats.iterations += 1;

        let tall = tallest(cols);
        let short = shortest(cols);
        if tall == short {
            break;
        }
        let tall_height = cols[tall].aggregate_height;
        let short_height = cols[short].aggregate_height;

        // (position in tall, position in short, resulting spread)
        let mut best: Option<(usize, usize, f64)> = None;
        for (pa, &a) in cols[tall].items.iter().enumerate() {
            for (pb, &b) in cols[short].items.iter().enumerate() {
                let delta = heights[a] - heights[b];
                if delta <= 0.0 {
                    continue;
                }
                let candidate = spread(cols.iter().enumerate().map(|(i, c)| {
                    if i == tall {
                        tall_height - delta
                    } else if i == short {
                        short_height + delta
                    } else {
                        c.aggregate_height
                    }
                }));
                if candidate < stats.variance && best.is_none_or(|(_, _, v)| candidate < v) {
                    best = Some((pa, pb, candidate));
                }
            }
        }

        let Some((pa, pb, _)) = best else {
            break;
        };

        let a = cols[tall].items[pa];
        let b = cols[short].items[pb];
        cols[tall].items[pa] = b;
        cols[short].items[pb] = a;
        for idx in [tall, short] {
            cols[idx].aggregate_height = cols[idx].items.iter().map(|&i| heights[i]).sum();
        }

        stats.swaps += 1;
        stats.variance = variance(cols);
        debug!(moved_down = a, moved_up = b, variance = stats.variance, "swapped items");
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_indices(columns: &[Column]) -> Vec<ItemIndex> {
        let mut seen: Vec<ItemIndex> = columns.iter().flat_map(|c| c.items.clone()).collect();
        seen.sort_unstable();
        seen
    }

    #[test]
    fn count_is_round_robin() {
        let cols = assign_count(7, 3);
        assert_eq!(cols[0].items, vec![0, 3, 6]);
        assert_eq!(cols[1].items, vec![1, 4]);
        assert_eq!(cols[2].items, vec![2, 5]);
    }

    #[test]
    fn count_keeps_columns_within_one_item() {
        for items in 0..40 {
            for k in 1..9 {
                let cols = assign_count(items, k);
                assert_eq!(cols.len(), k);
                let lens: Vec<usize> = cols.iter().map(Column::len).collect();
                let max = *lens.iter().max().unwrap();
                let min = *lens.iter().min().unwrap();
                assert!(max - min <= 1, "items={items} k={k} lens={lens:?}");
                assert_eq!(all_indices(&cols), (0..items).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn balanced_places_every_item_exactly_once() {
        let heights: Vec<f64> = (0..23).map(|i| ((i * 37) % 11 + 1) as f64 * 20.0).collect();
        for k in 1..8 {
            let result = assign_balanced(&heights, k, 0.05);
            assert_eq!(result.columns.len(), k);
            assert_eq!(all_indices(&result.columns), (0..heights.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn balanced_reaches_threshold_for_reference_input() {
        let heights = [300.0, 200.0, 100.0, 150.0, 250.0, 50.0];
        let result = assign_balanced(&heights, 3, 0.05);
        assert!(result.stats.variance <= 0.05, "variance {}", result.stats.variance);
        for col in &result.columns {
            assert_eq!(col.aggregate_height, 350.0);
        }
    }

    #[test]
    fn uniform_heights_need_no_swaps() {
        let result = assign_balanced(&[100.0; 4], 2, 0.05);
        assert_eq!(result.stats.swaps, 0);
        assert_eq!(result.stats.iterations, 0);
        assert_eq!(result.columns[0].len(), 2);
        assert_eq!(result.columns[1].len(), 2);
    }

    #[test]
    fn tallest_items_are_placed_first() {
        let result = assign_balanced(&[100.0, 200.0, 150.0, 50.0], 2, 0.05);
        // 200 → col 0, 150 → col 1, 100 → col 1, 50 → col 0.
        assert_eq!(result.columns[0].items, vec![1, 3]);
        assert_eq!(result.columns[1].items, vec![2, 0]);
        assert_eq!(result.stats.variance, 0.0);
    }

    #[test]
    fn optimization_swaps_to_close_the_gap() {
        // Greedy seed leaves 9 vs 11; one swap evens it out.
        let heights = [5.0, 5.0, 4.0, 3.0, 3.0];
        let result = assign_balanced(&heights, 2, 0.05);
        assert_eq!(result.stats.swaps, 1);
        assert_eq!(result.stats.variance, 0.0);
        assert_eq!(result.columns[0].aggregate_height, 10.0);
        assert_eq!(result.columns[1].aggregate_height, 10.0);
        assert_eq!(all_indices(&result.columns), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_threshold_still_terminates() {
        let heights = [7.0, 3.0, 3.0, 3.0, 1.0, 13.0, 2.0];
        let result = assign_balanced(&heights, 3, 0.0);
        assert!(result.stats.iterations <= MAX_OPTIMIZATION_ITERATIONS);
        assert_eq!(all_indices(&result.columns).len(), heights.len());
    }

    #[test]
    fn unmeasured_balanced_falls_back_to_count() {
        let result = assign_balanced(&[0.0; 5], 2, 0.05);
        assert_eq!(result.columns[0].items, vec![0, 2, 4]);
        assert_eq!(result.columns[1].items, vec![1, 3]);
    }

    #[test]
    fn more_columns_than_items_leaves_empty_columns() {
        let result = assign_balanced(&[120.0, 80.0], 4, 0.05);
        assert_eq!(result.columns.len(), 4);
        assert_eq!(result.columns.iter().filter(|c| c.is_empty()).count(), 2);
    }

    #[test]
    fn empty_input_yields_empty_columns() {
        let result = assign(Strategy::Balanced, &[], 3, 0.05);
        assert_eq!(result.columns.len(), 3);
        assert!(result.columns.iter().all(Column::is_empty));
        assert_eq!(result.stats.variance, 0.0);
    }

    #[test]
    fn count_strategy_reports_heights_without_using_them() {
        let result = assign(Strategy::Count, &[500.0, 10.0, 10.0, 10.0], 2, 0.05);
        assert_eq!(result.columns[0].items, vec![0, 2]);
        assert_eq!(result.columns[0].aggregate_height, 510.0);
        assert_eq!(result.columns[1].aggregate_height, 20.0);
    }

    #[test]
    fn variance_of_empty_columns_is_zero() {
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(variance(&[Column::default(), Column::default()]), 0.0);
    }
}
