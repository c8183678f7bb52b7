//! Height measurement tracking.
//!
//! Keeps the last known height per item and filters incoming
//! measurements so sub-pixel jitter cannot feed back into endless
//! redistribution.

use std::collections::HashMap;

use masonry_core::ItemIndex;
use tracing::trace;

/// Outcome of feeding one measurement to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Height moved by more than the threshold and was recorded.
    Significant { previous: Option<f64>, current: f64 },
    /// Within the noise threshold; state untouched.
    Insignificant,
    /// Zero, negative, or non-finite height: the element is not ready.
    Ignored,
}

impl Measurement {
    pub fn is_significant(&self) -> bool {
        matches!(self, Measurement::Significant { .. })
    }
}

/// Last known height of one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightRecord {
    pub item: ItemIndex,
    pub last_height: f64,
    pub measured: bool,
}

/// Per-generation height records.
#[derive(Debug, Clone)]
pub struct HeightTracker {
    records: HashMap<ItemIndex, HeightRecord>,
    threshold: f64,
}

impl HeightTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            records: HashMap::new(),
            threshold,
        }
    }

    /// Record a measurement for `item`.
    ///
    /// The first real measurement of an item always counts as
    /// significant when it exceeds the threshold (its baseline is zero).
    pub fn observe(&mut self, item: ItemIndex, height: f64) -> Measurement {
        if !height.is_finite() || height <= 0.0 {
            trace!(item, height, "ignoring unready measurement");
            return Measurement::Ignored;
        }

        let previous = self.records.get(&item).map(|r| r.last_height);
        let baseline = previous.unwrap_or(0.0);
        if (height - baseline).abs() <= self.threshold {
            return Measurement::Insignificant;
        }

        self.records.insert(
            item,
            HeightRecord {
                item,
                last_height: height,
                measured: true,
            },
        );
        Measurement::Significant {
            previous,
            current: height,
        }
    }

    pub fn get(&self, item: ItemIndex) -> Option<&HeightRecord> {
        self.records.get(&item)
    }

    /// Mean of all measured heights, or zero when nothing is measured.
    pub fn average(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let total: f64 = self.records.values().map(|r| r.last_height).sum();
        total / self.records.len() as f64
    }

    /// Measured height, or the current average for unmeasured items.
    pub fn height_or_estimate(&self, item: ItemIndex) -> f64 {
        self.records
            .get(&item)
            .map(|r| r.last_height)
            .unwrap_or_else(|| self.average())
    }

    /// Heights for items `0..count`, estimating the unmeasured ones.
    pub fn heights(&self, count: usize) -> Vec<f64> {
        let average = self.average();
        (0..count)
            .map(|i| self.records.get(&i).map(|r| r.last_height).unwrap_or(average))
            .collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negative_heights_are_ignored() {
        let mut tracker = HeightTracker::new(10.0);
        assert_eq!(tracker.observe(0, 0.0), Measurement::Ignored);
        assert_eq!(tracker.observe(0, -5.0), Measurement::Ignored);
        assert_eq!(tracker.observe(0, f64::NAN), Measurement::Ignored);
        assert!(tracker.get(0).is_none());
    }

    #[test]
    fn first_measurement_is_significant() {
        let mut tracker = HeightTracker::new(10.0);
        let m = tracker.observe(3, 120.0);
        assert_eq!(
            m,
            Measurement::Significant {
                previous: None,
                current: 120.0
            }
        );
        assert!(tracker.get(3).unwrap().measured);
    }

    #[test]
    fn small_changes_are_filtered() {
        let mut tracker = HeightTracker::new(10.0);
        tracker.observe(0, 100.0);

        assert_eq!(tracker.observe(0, 108.0), Measurement::Insignificant);
        // Exactly the threshold is still noise.
        assert_eq!(tracker.observe(0, 110.0), Measurement::Insignificant);
        assert_eq!(tracker.get(0).unwrap().last_height, 100.0);
    }

    #[test]
    fn large_changes_update_the_record() {
        let mut tracker = HeightTracker::new(10.0);
        tracker.observe(0, 100.0);
        let m = tracker.observe(0, 150.0);
        assert_eq!(
            m,
            Measurement::Significant {
                previous: Some(100.0),
                current: 150.0
            }
        );
        assert_eq!(tracker.get(0).unwrap().last_height, 150.0);
    }

    #[test]
    fn unmeasured_items_use_the_average() {
        let mut tracker = HeightTracker::new(10.0);
        assert_eq!(tracker.height_or_estimate(0), 0.0);

        tracker.observe(0, 100.0);
        tracker.observe(1, 300.0);
        assert_eq!(tracker.average(), 200.0);
        assert_eq!(tracker.heights(3), vec![100.0, 300.0, 200.0]);
    }

    #[test]
    fn clear_drops_every_record() {
        let mut tracker = HeightTracker::new(10.0);
        for i in 0..5 {
            tracker.observe(i, 50.0 + i as f64 * 20.0);
        }
        assert!((0..5).all(|i| tracker.get(i).is_some()));

        tracker.clear();
        assert!((0..5).all(|i| tracker.get(i).is_none()));
        assert_eq!(tracker.average(), 0.0);
    }
}
