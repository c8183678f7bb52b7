//! masonry-core — shared types for the masonry layout engine.
//!
//! Holds the data model every other crate speaks: items and their
//! opaque content, column assignments, layout configuration, and the
//! `masonry.toml` file format.
//!
//! Nothing in this crate schedules or measures; it only describes.

pub mod config;
pub mod content;
pub mod error;
pub mod types;

pub use config::{LayoutConfig, MasonryConfig, TimingConfig};
pub use content::{ContentNode, ImageProbe, ItemContent};
pub use error::{MasonryError, MasonryResult};
pub use types::*;
