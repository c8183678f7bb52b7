//! Size observation capability supplied by the host.

use masonry_core::ItemIndex;

/// Observes rendered item elements and reports their heights back to the
/// engine through [`crate::MasonryEngine::on_measurement`].
///
/// Hosts without such a facility pass `None` to the engine, which then
/// degrades the balanced strategy to count.
pub trait SizeObserver: Send {
    /// Start observing the element stamped with `item`'s index.
    fn observe(&mut self, item: ItemIndex);

    /// Stop observing every element.
    fn disconnect(&mut self);
}
