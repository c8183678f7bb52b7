//! Image readiness tracking.
//!
//! Images that are still loading will change their item's height when
//! they arrive. The tracker scans every item when content arrives,
//! waits for each pending image to reach a terminal outcome (a broken
//! image counts: its geometry has stopped changing too), then waits a
//! settle delay before reporting a single "all settled" event.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use masonry_core::{ImageProbe, Item, ItemContent, ItemIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Identifies one image: the owning item and its position in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId {
    pub item: ItemIndex,
    pub ordinal: usize,
}

/// Terminal outcome of an image load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageOutcome {
    Loaded,
    Failed,
}

/// A pending image the host should attach a one-shot load/error listener to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub id: ImageId,
    pub src: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Loading,
    Settling { deadline: Instant },
    Settled,
}

/// Per-generation image settlement state.
#[derive(Debug, Clone)]
pub struct ImageTracker {
    pending: BTreeMap<ImageId, String>,
    /// Every image present in the last scan, finished or not.
    known: BTreeSet<ImageId>,
    readiness: Readiness,
    settle_delay: Duration,
}

impl ImageTracker {
    /// Scan `items` for images.
    ///
    /// Already-complete images need no listener. With nothing pending the
    /// tracker starts settled and never emits an event.
    pub fn track<C: ItemContent>(items: &[Item<C>], settle_delay: Duration) -> Self {
        let mut pending = BTreeMap::new();
        let mut known = BTreeSet::new();

        for (id, probe) in scan(items) {
            known.insert(id);
            if !probe.complete {
                pending.insert(id, probe.src);
            }
        }

        if !pending.is_empty() {
            debug!(discovered = known.len(), pending = pending.len(), "tracking image loads");
        }

        Self {
            readiness: if pending.is_empty() {
                Readiness::Settled
            } else {
                Readiness::Loading
            },
            pending,
            known,
            settle_delay,
        }
    }

    /// Re-scan content that changed while the item count stayed the same.
    ///
    /// Images are matched by [`ImageId`]. One that already finished stays
    /// finished; one that disappeared stops being waited on; a new
    /// incomplete one is waited on. When the last pending image vanishes
    /// the settle delay starts from `now`.
    ///
    /// Returns `true` when images are loading again after the tracker had
    /// settled or started settling.
    pub fn rescan<C: ItemContent>(&mut self, items: &[Item<C>], now: Instant) -> bool {
        let mut pending = BTreeMap::new();
        let mut known = BTreeSet::new();

        for (id, probe) in scan(items) {
            known.insert(id);
            let waiting = self.pending.contains_key(&id) || !self.known.contains(&id);
            if !probe.complete && waiting {
                pending.insert(id, probe.src);
            }
        }
        self.known = known;

        if pending.keys().eq(self.pending.keys()) {
            self.pending = pending;
            return false;
        }
        debug!(
            before = self.pending.len(),
            after = pending.len(),
            "pending images changed with content"
        );
        self.pending = pending;

        match (self.readiness, self.pending.is_empty()) {
            (Readiness::Loading, true) => {
                self.readiness = Readiness::Settling {
                    deadline: now + self.settle_delay,
                };
                false
            }
            (Readiness::Loading, false) => false,
            (_, true) => false,
            (_, false) => {
                self.readiness = Readiness::Loading;
                true
            }
        }
    }

    /// Images awaiting a load or error notification.
    pub fn listeners(&self) -> Vec<ImageHandle> {
        self.pending
            .iter()
            .map(|(id, src)| ImageHandle {
                id: *id,
                src: src.clone(),
            })
            .collect()
    }

    /// Record a terminal outcome. Returns `true` when this was the last
    /// pending image and the settle delay has started.
    ///
    /// Unknown or repeated notifications are ignored.
    pub fn complete(&mut self, id: ImageId, outcome: ImageOutcome, now: Instant) -> bool {
        if self.pending.remove(&id).is_none() {
            return false;
        }
        debug!(item = id.item, ordinal = id.ordinal, ?outcome, remaining = self.pending.len(), "image finished");

        if self.pending.is_empty() && self.readiness == Readiness::Loading {
            self.readiness = Readiness::Settling {
                deadline: now + self.settle_delay,
            };
            return true;
        }
        false
    }

    /// Returns `true` once per settle, when the settle delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.readiness {
            Readiness::Settling { deadline } if now >= deadline => {
                self.readiness = Readiness::Settled;
                info!(images = self.known.len(), "all images settled");
                true
            }
            _ => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.readiness {
            Readiness::Settling { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.readiness == Readiness::Settled
    }
}

fn scan<C: ItemContent>(items: &[Item<C>]) -> Vec<(ImageId, ImageProbe)> {
    items
        .iter()
        .flat_map(|item| {
            item.content
                .images()
                .into_iter()
                .enumerate()
                .map(move |(ordinal, probe)| {
                    (
                        ImageId {
                            item: item.index,
                            ordinal,
                        },
                        probe,
                    )
                })
        })
        .collect()
}
