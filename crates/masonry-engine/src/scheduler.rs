//! Redistribution scheduler.
//!
//! A clock-injected state machine: callers pass `now` into every
//! operation and ask [`RedistributionScheduler::next_deadline`] when to
//! call [`RedistributionScheduler::poll`] again. No timers live here,
//! so tearing the scheduler down cannot leave anything to fire later.
//!
//! ```text
//! Idle ──start──▶ Observing ──change/settled──▶ PendingRedistribution
//!                    ▲                                   │
//!                    └──────── debounce elapsed ─────────┘
//! Observing ── stability elapsed ──▶ Stable (observer released)
//! ```

use std::time::{Duration, Instant};

use masonry_core::{SchedulerState, TimingConfig};
use tracing::{debug, info, warn};

/// Work the owner must perform after a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    /// Run the assignment engine once.
    Redistribute,
    /// Layout is stable; stop observing sizes.
    ReleaseObserver,
}

/// Debounce, pass-cap, and stability tracking for one item-set generation.
#[derive(Debug, Clone)]
pub struct RedistributionScheduler {
    state: SchedulerState,
    debounce_deadline: Option<Instant>,
    stable_deadline: Option<Instant>,
    /// Images still loading: stability cannot be declared yet.
    waiting_for_images: bool,
    passes: u32,
    debounce: Duration,
    stability: Duration,
    max_passes: u32,
}

impl RedistributionScheduler {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            state: SchedulerState::Idle,
            debounce_deadline: None,
            stable_deadline: None,
            waiting_for_images: false,
            passes: 0,
            debounce: timing.debounce(),
            stability: timing.stability(),
            max_passes: timing.max_passes,
        }
    }

    /// Begin observing. Stays idle for an empty item set.
    pub fn start(&mut self, item_count: usize, now: Instant) {
        if self.state != SchedulerState::Idle || item_count == 0 {
            return;
        }
        self.state = SchedulerState::Observing;
        self.arm_stability(now);
        debug!(items = item_count, "scheduler observing");
    }

    /// Suspend stability detection until [`Self::images_settled`].
    pub fn hold_for_images(&mut self) {
        self.waiting_for_images = true;
        self.stable_deadline = None;
    }

    /// A height changed significantly. Returns `true` when a
    /// redistribution was (re)scheduled.
    pub fn significant_change(&mut self, now: Instant) -> bool {
        if !self.is_active() {
            return false;
        }
        self.arm_stability(now);

        if self.passes >= self.max_passes {
            debug!(passes = self.passes, "redistribution cap reached, change recorded only");
            return false;
        }

        self.debounce_deadline = Some(now + self.debounce);
        self.state = SchedulerState::PendingRedistribution;
        true
    }

    /// Every image reached a terminal outcome and the settle delay passed.
    pub fn images_settled(&mut self, now: Instant) -> bool {
        self.waiting_for_images = false;
        self.significant_change(now)
    }

    /// Fire every deadline that has elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<SchedulerAction> {
        let mut actions = Vec::new();

        if let Some(deadline) = self.debounce_deadline
            && now >= deadline
        {
            self.debounce_deadline = None;
            self.passes += 1;
            self.state = SchedulerState::Observing;
            actions.push(SchedulerAction::Redistribute);

            if self.passes == self.max_passes {
                warn!(passes = self.passes, "redistribution pass limit reached");
            }
        }

        if self.state == SchedulerState::Observing
            && let Some(deadline) = self.stable_deadline
            && now >= deadline
        {
            self.stable_deadline = None;
            self.state = SchedulerState::Stable;
            info!(passes = self.passes, "layout stable, releasing observer");
            actions.push(SchedulerAction::ReleaseObserver);
        }

        actions
    }

    /// Earliest instant at which [`Self::poll`] can do something.
    pub fn next_deadline(&self) -> Option<Instant> {
        // Stability cannot fire while a redistribution is pending.
        self.debounce_deadline.or(self.stable_deadline)
    }

    /// Cancel every pending deadline. Returns `true` if observation was
    /// live and must be released by the owner.
    pub fn teardown(&mut self) -> bool {
        let was_active = self.is_active();
        self.debounce_deadline = None;
        self.stable_deadline = None;
        self.waiting_for_images = false;
        self.state = SchedulerState::Idle;
        was_active
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            SchedulerState::Observing | SchedulerState::PendingRedistribution
        )
    }

    fn arm_stability(&mut self, now: Instant) {
        self.stable_deadline = if self.waiting_for_images {
            None
        } else {
            Some(now + self.stability)
        };
    }
}
