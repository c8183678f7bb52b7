//! Trace replay.
//!
//! Feeds a recorded sequence of observer reports, viewport resizes, and
//! image completions through a [`MasonryEngine`] on a virtual clock.
//! Between events every engine deadline is polled at the instant it
//! falls due, so the output shows exactly when redistributions and the
//! observer release would happen.
//!
//! ```json
//! {
//!   "item_count": 4,
//!   "viewport_width": 1024,
//!   "events": [
//!     { "at_ms": 0, "kind": "measure", "item": 0, "height": 300 },
//!     { "at_ms": 40, "kind": "resize", "width": 640 },
//!     { "at_ms": 90, "kind": "image", "item": 2, "ordinal": 0, "outcome": "loaded" }
//!   ]
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use masonry_core::{ContentNode, Item, ItemIndex, Layout, MasonryConfig, SchedulerState};
use masonry_engine::{ImageId, ImageOutcome, MasonryEngine, MeasurementTarget, SizeObserver};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{format_layout, load_config};

#[derive(Debug, Clone, Deserialize)]
pub struct Trace {
    /// Item contents. Takes precedence over `item_count`.
    #[serde(default)]
    pub items: Vec<ContentNode>,
    /// Shorthand for that many plain text items.
    #[serde(default)]
    pub item_count: Option<usize>,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,
    #[serde(default)]
    pub events: Vec<TraceEvent>,
}

fn default_viewport_width() -> f64 {
    1024.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraceEvent {
    /// Offset from mount.
    pub at_ms: u64,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    Measure { item: ItemIndex, height: f64 },
    /// A report for an element the engine does not own.
    Foreign { height: f64 },
    Resize { width: f64 },
    Image {
        item: ItemIndex,
        ordinal: usize,
        outcome: ImageOutcome,
    },
    Unmount,
}

/// A layout the engine published.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub at_ms: u64,
    pub cause: &'static str,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub frames: Vec<Frame>,
    pub final_state: SchedulerState,
    pub passes: u32,
    pub stable_at_ms: Option<u64>,
    pub observed: usize,
    pub disconnects: usize,
}

#[derive(Default)]
struct ObserverCounts {
    observed: AtomicUsize,
    disconnects: AtomicUsize,
}

struct CountingObserver(Arc<ObserverCounts>);

impl SizeObserver for CountingObserver {
    fn observe(&mut self, _item: ItemIndex) {
        self.0.observed.fetch_add(1, Ordering::Relaxed);
    }

    fn disconnect(&mut self) {
        self.0.disconnects.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn run(config: Option<&str>, trace: &str, format: &str) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let raw = std::fs::read_to_string(trace).with_context(|| format!("reading trace {trace}"))?;
    let trace: Trace = serde_json::from_str(&raw).context("parsing trace")?;
    let report = replay(&config, &trace)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            for frame in &report.frames {
                println!("[{:>6}ms] {}", frame.at_ms, frame.cause);
                for line in format_layout(&frame.layout).lines() {
                    println!("    {line}");
                }
            }
            let stable = report
                .stable_at_ms
                .map(|ms| format!(" at {ms}ms"))
                .unwrap_or_default();
            println!(
                "final state: {}{} after {} passes (observed {}, disconnects {})",
                report.final_state.label(),
                stable,
                report.passes,
                report.observed,
                report.disconnects
            );
        }
    }

    Ok(())
}

/// Replay `trace` and collect every published layout.
pub fn replay(config: &MasonryConfig, trace: &Trace) -> anyhow::Result<SimulationReport> {
    let counts = Arc::new(ObserverCounts::default());
    let mut engine = MasonryEngine::new(
        Some(Box::new(CountingObserver(counts.clone()))),
        config.timing.clone(),
    );

    let items = if trace.items.is_empty() {
        Item::from_contents(
            (0..trace.item_count.unwrap_or(0)).map(|i| ContentNode::text(format!("Item {i}"))),
        )
    } else {
        Item::from_contents(trace.items.iter().cloned())
    };

    let mut clock = VirtualClock::new();
    let layout =
        engine.on_configuration_changed(config.layout.clone(), &items, trace.viewport_width, clock.t0)?;
    clock.frames.push(Frame {
        at_ms: 0,
        cause: "mount",
        layout: layout.clone(),
    });

    let mut events: Vec<&TraceEvent> = trace.events.iter().collect();
    events.sort_by_key(|e| e.at_ms);

    for event in events {
        let now = clock.at(event.at_ms)?;
        clock.advance(&mut engine, Some(now));
        debug!(at_ms = event.at_ms, kind = ?event.kind, "replaying event");

        match event.kind {
            TraceEventKind::Measure { item, height } => {
                engine.on_measurement(MeasurementTarget::Item(item), height, now);
            }
            TraceEventKind::Foreign { height } => {
                engine.on_measurement(MeasurementTarget::Foreign, height, now);
            }
            TraceEventKind::Resize { width } => {
                if let Some(layout) = engine.on_viewport_resize(width, now) {
                    clock.frames.push(Frame {
                        at_ms: event.at_ms,
                        cause: "resize",
                        layout: layout.clone(),
                    });
                }
            }
            TraceEventKind::Image {
                item,
                ordinal,
                outcome,
            } => {
                engine.on_image_complete(ImageId { item, ordinal }, outcome, now);
            }
            TraceEventKind::Unmount => engine.unmount(),
        }
    }
    clock.advance(&mut engine, None);

    Ok(SimulationReport {
        frames: clock.frames,
        final_state: engine.scheduler_state(),
        passes: engine.passes(),
        stable_at_ms: clock.stable_at_ms,
        observed: counts.observed.load(Ordering::Relaxed),
        disconnects: counts.disconnects.load(Ordering::Relaxed),
    })
}

struct VirtualClock {
    t0: Instant,
    frames: Vec<Frame>,
    stable_at_ms: Option<u64>,
}

impl VirtualClock {
    fn new() -> Self {
        Self {
            t0: Instant::now(),
            frames: Vec::new(),
            stable_at_ms: None,
        }
    }

    fn at(&self, ms: u64) -> anyhow::Result<Instant> {
        self.t0
            .checked_add(Duration::from_millis(ms))
            .with_context(|| format!("event offset {ms}ms is out of range"))
    }

    fn millis(&self, instant: Instant) -> u64 {
        instant.duration_since(self.t0).as_millis() as u64
    }

    /// Poll every deadline due up to `until`, or all of them when `None`.
    fn advance(&mut self, engine: &mut MasonryEngine, until: Option<Instant>) {
        while let Some(deadline) = engine.next_deadline()
            && until.is_none_or(|until| deadline <= until)
        {
            let at_ms = self.millis(deadline);
            if let Some(layout) = engine.poll(deadline) {
                self.frames.push(Frame {
                    at_ms,
                    cause: "redistribute",
                    layout: layout.clone(),
                });
            }
            if engine.scheduler_state() == SchedulerState::Stable && self.stable_at_ms.is_none() {
                self.stable_at_ms = Some(at_ms);
            }
        }
    }
}
