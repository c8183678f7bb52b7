//! masonry-layout — decides which item goes in which column.
//!
//! Pure functions only: no clocks, no observers. The engine crate feeds
//! these with measured heights and the resolved column count.
//!
//! # Components
//!
//! - **`breakpoints`** — viewport width → column count
//! - **`assign`** — count (round-robin) and balanced (LPT + swap) assignment

pub mod assign;
pub mod breakpoints;

pub use assign::{
    Assignment, AssignmentStats, MAX_OPTIMIZATION_ITERATIONS, assign, assign_balanced,
    assign_count, variance,
};
pub use breakpoints::{ColumnResolver, resolve_columns};
