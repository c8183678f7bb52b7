//! masonry-engine — measurement-driven masonry layout.
//!
//! Distributes a dynamic set of variable-height items across columns,
//! learns their real heights from a host-supplied size observer, and
//! re-balances while keeping its own measurement cost bounded.
//!
//! # Architecture
//!
//! ```text
//! MasonryEngine (one per item set)
//!   ├── ColumnResolver (viewport width → column count)
//!   └── Generation
//!       ├── HeightTracker (last height per item, 10px noise filter)
//!       ├── ImageTracker (pending images, 1s settle delay)
//!       └── RedistributionScheduler (500ms debounce, 10-pass cap, 2s stability)
//!
//! MasonryDriver
//!   └── tokio task: EngineEvent in → Layout out (watch channel)
//! ```
//!
//! The engine itself never reads a clock; every entry point takes `now`.
//! [`MasonryDriver`] supplies tokio time for hosts that want the timers
//! handled for them.

pub mod driver;
pub mod engine;
pub mod error;
pub mod heights;
pub mod images;
pub mod observer;
pub mod scheduler;

pub use driver::{EngineEvent, EngineStatus, MasonryDriver};
pub use engine::{MasonryEngine, MeasurementTarget};
pub use error::{EngineError, EngineResult};
pub use heights::{HeightRecord, HeightTracker, Measurement};
pub use images::{ImageHandle, ImageId, ImageOutcome, ImageTracker};
pub use observer::SizeObserver;
pub use scheduler::{RedistributionScheduler, SchedulerAction};
