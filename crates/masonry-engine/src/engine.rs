//! The masonry engine, one instance per rendered item set.
//!
//! The host drives it through explicit entry points instead of a render
//! loop:
//!
//! - [`MasonryEngine::on_configuration_changed`]: new config and items
//! - [`MasonryEngine::on_viewport_resize`]: viewport width changed
//! - [`MasonryEngine::on_measurement`]: the size observer reported a height
//! - [`MasonryEngine::on_image_complete`]: an image loaded or failed
//! - [`MasonryEngine::poll`]: time passed; fire due deadlines
//!
//! All measurement state for an item set lives in a `Generation`. It
//! is rebuilt wholesale when the item count changes, and its heights
//! and scheduler are reset when the column count changes or the
//! strategy switches into balanced, so stale records never leak into a
//! new assignment.

use std::time::Instant;

use masonry_core::{
    Item, ItemContent, ItemIndex, Layout, LayoutConfig, SchedulerState, Strategy, TimingConfig,
};
use masonry_layout::{ColumnResolver, assign};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::EngineResult;
use crate::heights::{HeightRecord, HeightTracker, Measurement};
use crate::images::{ImageHandle, ImageId, ImageOutcome, ImageTracker};
use crate::observer::SizeObserver;
use crate::scheduler::{RedistributionScheduler, SchedulerAction};

/// What a size-observation callback reported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementTarget {
    /// An element carrying the engine's item attributes.
    Item(ItemIndex),
    /// Anything else; ignored.
    Foreign,
}

/// Measurement and scheduling state for one item set.
struct Generation {
    item_count: usize,
    columns: usize,
    /// Effective strategy, after any capability fallback.
    strategy: Strategy,
    heights: HeightTracker,
    images: ImageTracker,
    scheduler: RedistributionScheduler,
    /// The size observer is attached to this generation's items.
    observing: bool,
}

/// Column assignment engine for a single masonry container.
pub struct MasonryEngine {
    observer: Option<Box<dyn SizeObserver>>,
    timing: TimingConfig,
    config: LayoutConfig,
    resolver: ColumnResolver,
    viewport_width: f64,
    generation: Option<Generation>,
    layout: Layout,
    fallback_warned: bool,
}

impl MasonryEngine {
    /// Create an engine. `observer` is `None` when the host cannot observe
    /// element sizes.
    pub fn new(observer: Option<Box<dyn SizeObserver>>, timing: TimingConfig) -> Self {
        let config = LayoutConfig::default();
        Self {
            observer,
            timing,
            resolver: ColumnResolver::new(config.columns, config.breakpoints.clone()),
            layout: Layout::empty(config.columns, config.gap, config.strategy),
            config,
            viewport_width: 0.0,
            generation: None,
            fallback_warned: false,
        }
    }

    /// Apply a new configuration and item set.
    ///
    /// Items are compared by count only: a same-sized set keeps its
    /// measurements, though its content is re-scanned for images.
    pub fn on_configuration_changed<C: ItemContent>(
        &mut self,
        config: LayoutConfig,
        items: &[Item<C>],
        viewport_width: f64,
        now: Instant,
    ) -> EngineResult<&Layout> {
        config.validate()?;

        let strategy = self.effective_strategy(config.strategy);
        self.resolver.reconfigure(config.columns, config.breakpoints.clone());
        let (columns, _) = self.resolver.update(viewport_width);
        self.viewport_width = viewport_width;
        self.config = config;

        let (rebuild, reset) = match self.generation.as_ref() {
            Some(g) if g.item_count == items.len() => {
                let switched = (g.strategy == Strategy::Balanced) != (strategy == Strategy::Balanced);
                (false, switched || g.columns != columns)
            }
            _ => (true, false),
        };
        if rebuild {
            self.rebuild(items, columns, strategy, now);
        } else {
            self.rescan_images(items, now);
            if reset {
                self.reset_measurements(columns, strategy, now);
            }
        }

        self.recompute();
        Ok(&self.layout)
    }

    /// React to a viewport width change. Returns the new layout when the
    /// resolved column count changed.
    pub fn on_viewport_resize(&mut self, width: f64, now: Instant) -> Option<&Layout> {
        self.viewport_width = width;
        let (columns, changed) = self.resolver.update(width);
        let generation = self.generation.as_ref()?;
        if !changed || generation.columns == columns {
            return None;
        }

        let strategy = generation.strategy;
        self.reset_measurements(columns, strategy, now);
        self.recompute();
        Some(&self.layout)
    }

    /// Feed one size-observation report.
    pub fn on_measurement(
        &mut self,
        target: MeasurementTarget,
        height: f64,
        now: Instant,
    ) -> Measurement {
        let Some(generation) = self.generation.as_mut() else {
            return Measurement::Ignored;
        };
        let MeasurementTarget::Item(item) = target else {
            trace!("ignoring measurement for foreign target");
            return Measurement::Ignored;
        };
        if item >= generation.item_count || !generation.observing {
            trace!(item, "ignoring measurement for unobserved item");
            return Measurement::Ignored;
        }

        let measurement = generation.heights.observe(item, height);
        if measurement.is_significant() {
            let scheduled = generation.scheduler.significant_change(now);
            debug!(item, height, scheduled, "significant height change");
        }
        measurement
    }

    /// Feed a whole observer callback. Every entry is recorded before any
    /// redistribution can run. Returns the number of significant changes.
    pub fn on_measurements(
        &mut self,
        batch: impl IntoIterator<Item = (MeasurementTarget, f64)>,
        now: Instant,
    ) -> usize {
        batch
            .into_iter()
            .filter(|&(target, height)| self.on_measurement(target, height, now).is_significant())
            .count()
    }

    /// An image reached a terminal outcome.
    pub fn on_image_complete(&mut self, id: ImageId, outcome: ImageOutcome, now: Instant) {
        if let Some(generation) = self.generation.as_mut() {
            generation.images.complete(id, outcome, now);
        }
    }

    /// Fire every deadline due by `now`. Returns the layout when a
    /// redistribution ran.
    pub fn poll(&mut self, now: Instant) -> Option<&Layout> {
        let generation = self.generation.as_mut()?;

        if generation.images.poll(now) {
            generation.scheduler.images_settled(now);
        }

        let mut redistribute = false;
        for action in generation.scheduler.poll(now) {
            match action {
                SchedulerAction::Redistribute => redistribute = true,
                SchedulerAction::ReleaseObserver => {
                    release_observer(&mut self.observer, generation);
                }
            }
        }

        if redistribute {
            self.recompute();
            return Some(&self.layout);
        }
        None
    }

    /// Earliest instant at which [`Self::poll`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let generation = self.generation.as_ref()?;
        match (generation.images.next_deadline(), generation.scheduler.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Tear down: cancel deadlines and release the observer.
    pub fn unmount(&mut self) {
        if let Some(generation) = self.teardown() {
            info!(items = generation.item_count, "masonry unmounted");
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.generation
            .as_ref()
            .map(|g| g.scheduler.state())
            .unwrap_or_default()
    }

    /// Redistribution passes run in the current generation.
    pub fn passes(&self) -> u32 {
        self.generation
            .as_ref()
            .map(|g| g.scheduler.passes())
            .unwrap_or(0)
    }

    pub fn is_observing(&self) -> bool {
        self.generation.as_ref().is_some_and(|g| g.observing)
    }

    /// Images the host should attach one-shot load/error listeners to.
    pub fn pending_images(&self) -> Vec<ImageHandle> {
        self.generation
            .as_ref()
            .map(|g| g.images.listeners())
            .unwrap_or_default()
    }

    pub fn height_record(&self, item: ItemIndex) -> Option<HeightRecord> {
        self.generation
            .as_ref()
            .and_then(|g| g.heights.get(item).copied())
    }

    fn effective_strategy(&mut self, requested: Strategy) -> Strategy {
        if requested == Strategy::Balanced && self.observer.is_none() {
            if !self.fallback_warned {
                warn!("size observer not available, falling back to count strategy");
                self.fallback_warned = true;
            }
            return Strategy::Count;
        }
        requested
    }

    /// New content at the same item count: heights stay, images are re-read.
    fn rescan_images<C: ItemContent>(&mut self, items: &[Item<C>], now: Instant) {
        let Some(generation) = self.generation.as_mut() else {
            return;
        };
        if generation.images.rescan(items, now) && generation.scheduler.is_active() {
            generation.scheduler.hold_for_images();
        }
    }

    /// Replace the whole generation for a new item set.
    fn rebuild<C: ItemContent>(
        &mut self,
        items: &[Item<C>],
        columns: usize,
        strategy: Strategy,
        now: Instant,
    ) {
        self.teardown();

        let mut generation = Generation {
            item_count: items.len(),
            columns,
            strategy,
            heights: HeightTracker::new(self.timing.significance_px),
            images: ImageTracker::track(items, self.timing.image_settle()),
            scheduler: RedistributionScheduler::new(&self.timing),
            observing: false,
        };
        begin(&mut self.observer, &mut generation, now);
        info!(
            items = generation.item_count,
            columns,
            strategy = strategy.label(),
            "masonry generation created"
        );
        self.generation = Some(generation);
    }

    fn teardown(&mut self) -> Option<Generation> {
        let mut generation = self.generation.take()?;
        generation.scheduler.teardown();
        release_observer(&mut self.observer, &mut generation);
        Some(generation)
    }

    /// Clear heights and restart scheduling, keeping image tracking.
    fn reset_measurements(&mut self, columns: usize, strategy: Strategy, now: Instant) {
        let Some(generation) = self.generation.as_mut() else {
            return;
        };
        generation.scheduler.teardown();
        release_observer(&mut self.observer, generation);

        generation.columns = columns;
        generation.strategy = strategy;
        generation.heights.clear();
        generation.scheduler = RedistributionScheduler::new(&self.timing);
        begin(&mut self.observer, generation, now);
        debug!(columns, strategy = strategy.label(), "measurements reset");
    }

    fn recompute(&mut self) {
        let (heights, columns, strategy) = match self.generation.as_ref() {
            Some(g) if g.strategy == Strategy::Balanced => {
                (g.heights.heights(g.item_count), g.columns, g.strategy)
            }
            Some(g) => (vec![0.0; g.item_count], g.columns, g.strategy),
            None => (Vec::new(), self.resolver.current().unwrap_or(1), self.config.strategy),
        };

        let assignment = assign(strategy, &heights, columns, self.config.balance_threshold);
        debug!(
            items = heights.len(),
            columns,
            variance = assignment.stats.variance,
            swaps = assignment.stats.swaps,
            "assignment computed"
        );

        self.layout = Layout {
            columns: assignment.columns,
            gap: self.config.gap,
            smooth_transitions: self.config.smooth_transitions,
            strategy,
        };
    }
}

/// Attach observation and start scheduling when the generation needs it.
fn begin(observer: &mut Option<Box<dyn SizeObserver>>, generation: &mut Generation, now: Instant) {
    if generation.strategy != Strategy::Balanced || generation.item_count == 0 {
        return;
    }
    let Some(observer) = observer.as_mut() else {
        return;
    };

    for item in 0..generation.item_count {
        observer.observe(item);
    }
    generation.observing = true;

    if !generation.images.is_settled() {
        generation.scheduler.hold_for_images();
    }
    generation.scheduler.start(generation.item_count, now);
}

fn release_observer(observer: &mut Option<Box<dyn SizeObserver>>, generation: &mut Generation) {
    if !generation.observing {
        return;
    }
    if let Some(observer) = observer.as_mut() {
        observer.disconnect();
    }
    generation.observing = false;
    debug!(items = generation.item_count, "size observer released");
}
