#![forbid(unsafe_code)]

//! Mount-cycle controller.
//!
//! Two states, `Empty` and `Populated`. The controller owns visibility, the
//! mount generation, and the item count; the identity set is derived from
//! those three values by [`registry::identities`](crate::registry::identities).
//!
//! Manual operations take a [`Control`] token. While the stress scheduler
//! holds control they are rejected without touching state.
//!
//! # Remount
//!
//! A remount unmounts immediately and arms a timer. Only when that timer
//! fires does the next generation mount, so every destruction of the old
//! generation has been observed before any creation of the new one. The
//! pending timer is cancelled by any superseding operation (toggle, another
//! remount, stress start) and by dropping the controller.

use std::time::Duration;

use crate::lab::LabTimer;
use crate::registry::{ItemCount, ItemIdentity, MountGeneration, identities};
use crate::timer::{TimerHandle, TimerId, TimerQueue};

/// Whether the item grid is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountState {
    /// Nothing mounted.
    Empty,
    /// `count` items of the current generation mounted.
    Populated,
}

/// Who currently owns the mount/unmount transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Manual intents are honored.
    Manual,
    /// The stress scheduler has exclusive control.
    Stress,
}

/// Result of a controller operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Empty → Populated.
    Mounted {
        /// Newly mounted generation.
        generation: MountGeneration,
        /// Items in the new set.
        count: ItemCount,
    },
    /// Populated → Empty.
    Unmounted {
        /// Generation torn down.
        generation: MountGeneration,
    },
    /// A remount timer was armed.
    RemountScheduled {
        /// Generation current when the remount was requested.
        generation: MountGeneration,
        /// Whether the grid had to be unmounted first.
        unmounted: bool,
        /// Delay until the fresh mount.
        delay: Duration,
    },
    /// Refused: the stress scheduler holds control.
    Rejected,
    /// Nothing to do.
    Unchanged,
}

/// State machine for manual mount/unmount/remount.
#[derive(Debug)]
pub struct CycleController {
    state: MountState,
    generation: MountGeneration,
    count: ItemCount,
    remount_delay: Duration,
    pending_remount: Option<TimerHandle>,
}

impl CycleController {
    /// Create an empty controller.
    pub fn new(count: ItemCount, remount_delay: Duration) -> Self {
        Self {
            state: MountState::Empty,
            generation: MountGeneration::ZERO,
            count,
            remount_delay,
            pending_remount: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> MountState {
        self.state
    }

    /// Whether the grid is mounted.
    pub fn is_visible(&self) -> bool {
        self.state == MountState::Populated
    }

    /// Latest mount generation.
    pub fn generation(&self) -> MountGeneration {
        self.generation
    }

    /// Current item count setting.
    pub fn count(&self) -> ItemCount {
        self.count
    }

    /// Whether a remount is waiting for its timer.
    pub fn remount_pending(&self) -> bool {
        self.pending_remount
            .as_ref()
            .is_some_and(TimerHandle::is_pending)
    }

    /// Identity set implied by the current state.
    pub fn identities(&self) -> impl ExactSizeIterator<Item = ItemIdentity> + Clone {
        identities(self.is_visible(), self.generation, self.count)
    }

    /// Mount if empty, unmount if populated.
    pub fn toggle(&mut self, control: Control) -> Transition {
        if control == Control::Stress {
            return Transition::Rejected;
        }
        self.cancel_remount();
        match self.state {
            MountState::Empty => self.mount(),
            MountState::Populated => self.unmount(),
        }
    }

    /// Unmount now and mount a fresh generation after the remount delay.
    pub fn remount(&mut self, control: Control, timers: &mut TimerQueue<LabTimer>) -> Transition {
        if control == Control::Stress {
            return Transition::Rejected;
        }
        let generation = self.generation;
        let unmounted = matches!(self.unmount(), Transition::Unmounted { .. });
        // Replacing the handle cancels any earlier pending remount.
        self.pending_remount = Some(timers.schedule(self.remount_delay, LabTimer::RemountDue));
        Transition::RemountScheduled {
            generation,
            unmounted,
            delay: self.remount_delay,
        }
    }

    /// Handle a fired remount timer.
    ///
    /// Timers that are not the currently armed remount are ignored.
    pub fn complete_remount(&mut self, timer: TimerId) -> Transition {
        match self.pending_remount.take() {
            Some(handle) if handle.id() == timer => self.mount(),
            other => {
                tracing::trace!(timer_id = timer, "stale remount timer ignored");
                self.pending_remount = other;
                Transition::Unchanged
            }
        }
    }

    /// Cancel a pending remount. Returns whether one was pending.
    pub fn cancel_remount(&mut self) -> bool {
        match self.pending_remount.take() {
            Some(handle) => {
                let was_pending = handle.is_pending();
                handle.cancel();
                if was_pending {
                    tracing::debug!(timer_id = handle.id(), "pending remount cancelled");
                }
                was_pending
            }
            None => false,
        }
    }

    /// Change the count by `delta`, clamped. Returns the new count if it changed.
    ///
    /// Visibility and generation are untouched.
    pub fn adjust_count(&mut self, delta: i32) -> Option<ItemCount> {
        let next = self.count.adjusted(delta);
        if next == self.count {
            return None;
        }
        self.count = next;
        Some(next)
    }

    /// Empty → Populated with a fresh generation.
    pub(crate) fn mount(&mut self) -> Transition {
        if self.state == MountState::Populated {
            return Transition::Unchanged;
        }
        self.generation = self.generation.next();
        self.state = MountState::Populated;
        Transition::Mounted {
            generation: self.generation,
            count: self.count,
        }
    }

    /// Populated → Empty, generation unchanged.
    pub(crate) fn unmount(&mut self) -> Transition {
        if self.state == MountState::Empty {
            return Transition::Unchanged;
        }
        self.state = MountState::Empty;
        Transition::Unmounted {
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    fn controller() -> CycleController {
        CycleController::new(ItemCount::new(50), DELAY)
    }

    fn fire(queue: &mut TimerQueue<LabTimer>, until: Duration) -> Vec<TimerId> {
        let mut ids = Vec::new();
        while let Some(fired) = queue.pop_due(until) {
            ids.push(fired.id);
        }
        queue.settle(until);
        ids
    }

    #[test]
    fn starts_empty_at_generation_zero() {
        let c = controller();
        assert_eq!(c.state(), MountState::Empty);
        assert_eq!(c.generation(), MountGeneration::ZERO);
        assert_eq!(c.identities().len(), 0);
    }

    #[test]
    fn toggle_alternates_and_bumps_generation_on_mount() {
        let mut c = controller();
        assert_eq!(
            c.toggle(Control::Manual),
            Transition::Mounted {
                generation: MountGeneration::new(1),
                count: ItemCount::new(50)
            }
        );
        assert_eq!(c.identities().len(), 50);
        assert_eq!(
            c.toggle(Control::Manual),
            Transition::Unmounted {
                generation: MountGeneration::new(1)
            }
        );
        assert_eq!(c.generation(), MountGeneration::new(1));
        assert_eq!(c.identities().len(), 0);
    }

    #[test]
    fn stress_control_rejects_manual_ops() {
        let mut c = controller();
        let mut timers = TimerQueue::new();
        assert_eq!(c.toggle(Control::Stress), Transition::Rejected);
        assert_eq!(c.remount(Control::Stress, &mut timers), Transition::Rejected);
        assert_eq!(c.state(), MountState::Empty);
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn remount_unmounts_then_mounts_after_delay() {
        let mut c = controller();
        let mut timers = TimerQueue::new();
        c.toggle(Control::Manual);

        let t = c.remount(Control::Manual, &mut timers);
        assert_eq!(
            t,
            Transition::RemountScheduled {
                generation: MountGeneration::new(1),
                unmounted: true,
                delay: DELAY
            }
        );
        assert_eq!(c.state(), MountState::Empty);
        assert!(c.remount_pending());

        assert!(fire(&mut timers, DELAY / 2).is_empty());
        let ids = fire(&mut timers, DELAY);
        assert_eq!(ids.len(), 1);
        assert!(matches!(
            c.complete_remount(ids[0]),
            Transition::Mounted { generation, .. } if generation == MountGeneration::new(2)
        ));
        assert!(!c.remount_pending());
    }

    #[test]
    fn toggle_supersedes_pending_remount() {
        let mut c = controller();
        let mut timers = TimerQueue::new();
        c.toggle(Control::Manual);
        c.remount(Control::Manual, &mut timers);

        assert!(matches!(c.toggle(Control::Manual), Transition::Mounted { .. }));
        assert!(!c.remount_pending());
        assert!(fire(&mut timers, DELAY * 10).is_empty());
        assert_eq!(c.generation(), MountGeneration::new(2));
    }

    #[test]
    fn second_remount_replaces_first() {
        let mut c = controller();
        let mut timers = TimerQueue::new();
        c.remount(Control::Manual, &mut timers);
        timers.settle(DELAY / 2);
        c.remount(Control::Manual, &mut timers);
        assert_eq!(timers.pending(), 1);

        let ids = fire(&mut timers, DELAY * 10);
        assert_eq!(ids.len(), 1);
        assert!(matches!(c.complete_remount(ids[0]), Transition::Mounted { .. }));
        assert_eq!(c.generation(), MountGeneration::new(1));
    }

    #[test]
    fn stale_remount_timer_is_ignored() {
        let mut c = controller();
        assert_eq!(c.complete_remount(42), Transition::Unchanged);
        assert_eq!(c.state(), MountState::Empty);
    }

    #[test]
    fn adjust_count_clamps_and_reports_changes() {
        let mut c = CycleController::new(ItemCount::new(190), DELAY);
        assert_eq!(c.adjust_count(10), Some(ItemCount::new(200)));
        assert_eq!(c.adjust_count(10), None);
        assert_eq!(c.count().get(), 200);
        assert_eq!(c.state(), MountState::Empty);
        assert_eq!(c.generation(), MountGeneration::ZERO);
    }
}
